//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Answer questions about your documents, citing the passages used.
#[derive(Parser, Debug)]
#[command(name = "cite", version, about)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebuild the index from files and directories.
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ask a single question.
    Ask {
        question: String,
        /// Number of passages to retrieve.
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
        /// Print retrieved passages with their distances.
        #[arg(long)]
        show_chunks: bool,
    },
    /// Interactive session; type `exit` or `quit` to leave.
    Chat {
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
        #[arg(long)]
        show_chunks: bool,
    },
    /// Show the published index generation.
    Status,
}
