//! CLI argument definitions using clap
//!
//! Commands:
//! - docrest serve --config <path> [--port <n>]
//! - docrest query --config <path> <path-and-query>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Config file used when `--config` is not given
pub const DEFAULT_CONFIG: &str = "./docrest.json";

/// docrest - REST collections over a document store
#[derive(Parser, Debug)]
#[command(name = "docrest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Execute a single GET request and print the response body
    Query {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Request path and query, e.g. "/data/books?sortBy=title"
        target: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
