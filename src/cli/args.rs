//! CLI argument definitions using clap
//!
//! Commands:
//! - modelforge init --config <path>
//! - modelforge start --config <path>
//! - modelforge exec --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// modelforge - runtime-defined models and records over EAV meta-tables
#[derive(Parser, Debug)]
#[command(name = "modelforge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./modelforge.json")]
        config: PathBuf,
    },

    /// Serve JSON requests from stdin, one per line
    Start {
        /// Path to configuration file
        #[arg(long, default_value = "./modelforge.json")]
        config: PathBuf,
    },

    /// Execute a single request from stdin and exit
    Exec {
        /// Path to configuration file
        #[arg(long, default_value = "./modelforge.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
