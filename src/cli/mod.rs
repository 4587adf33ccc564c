//! CLI module for docrest
//!
//! Provides command-line interface for:
//! - serve: load config and seeds, then run the HTTP server
//! - query: one-shot GET request against the seeded storage

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command, DEFAULT_CONFIG};
pub use commands::{build_dispatcher, execute_query, load_config, query, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
