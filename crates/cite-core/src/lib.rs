//! Configuration and application wiring shared by the `cite` binary and its tests.

pub mod bootstrap;
pub mod config;
pub mod vault;

pub use bootstrap::{App, Status};
pub use config::Config;
