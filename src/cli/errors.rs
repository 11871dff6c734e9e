//! CLI error types
//!
//! Every CLI error ends the process: `main` prints `<code>: <message>` on
//! stderr and exits non-zero. Store failures keep their own code so a
//! corrupted journal reports `FORGE_DATA_CORRUPTION`, not a generic boot
//! failure.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::store::StorageError;

#[derive(Debug, Error)]
pub enum CliError {
    /// Config file unreadable, malformed or failing validation
    #[error("{0}")]
    Config(String),

    /// `init` found an existing journal
    #[error("data directory {} already initialized", .0.display())]
    AlreadyInitialized(PathBuf),

    /// A file-backed boot found no journal
    #[error("data directory {} not initialized; run 'modelforge init' first", .0.display())]
    NotInitialized(PathBuf),

    /// `init` could not lay out the data directory
    #[error("failed to create {}: {source}", path.display())]
    Layout {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The journal could not be opened or replayed
    #[error("failed to open store: {0}")]
    Store(#[from] StorageError),

    /// A request line could not be read
    #[error("failed to read request: {0}")]
    Input(#[from] io::Error),

    /// `exec` was given no request
    #[error("empty request")]
    EmptyInput,

    /// A response could not be written
    #[error("failed to write response: {0}")]
    Output(#[source] io::Error),
}

impl CliError {
    /// Config error from a message
    pub fn config(msg: impl Into<String>) -> Self {
        CliError::Config(msg.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "FORGE_CLI_CONFIG_ERROR",
            CliError::AlreadyInitialized(_) => "FORGE_CLI_ALREADY_INITIALIZED",
            CliError::NotInitialized(_) => "FORGE_CLI_NOT_INITIALIZED",
            CliError::Layout { .. } => "FORGE_CLI_INIT_FAILED",
            CliError::Store(e) => e.code().code(),
            CliError::Input(_) | CliError::EmptyInput | CliError::Output(_) => "FORGE_CLI_IO_ERROR",
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
