//! Secret values kept out of logs and debug output.

use std::fmt;

/// Variables consulted for the OpenAI API key, in priority order.
pub const OPENAI_KEY_VARS: [&str; 2] = ["CITE_OPENAI_API_KEY", "OPENAI_API_KEY"];

/// Wrapper that redacts its contents in `Debug` and `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// First non-empty value among `keys` in the process environment.
#[must_use]
pub fn env_secret(keys: &[&str]) -> Option<Secret> {
    keys.iter()
        .filter_map(|k| std::env::var(k).ok())
        .find(|v| !v.trim().is_empty())
        .map(Secret::new)
}
