//! CLI module for modelforge
//!
//! Provides command-line interface for:
//! - init: Create the data directory and journal
//! - start: Boot and serve line-delimited JSON requests
//! - exec: One-shot request execution

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{boot, exec, init, init_data_dir, run, run_command, serve, start};
pub use config::{BackendKind, Config};
pub use errors::{CliError, CliResult};
pub use io::{read_request, read_requests, write_error, write_json, write_response};
