//! CLI command implementations
//!
//! Boot sequence, shared by `start` and `exec`:
//! 1. Configuration load
//! 2. Logger setup
//! 3. Store open (journal replay for the file backend)
//! 4. API activation

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use super::args::Command;
use super::config::{BackendKind, Config};
use super::errors::{CliError, CliResult};
use super::io::{read_request, read_requests, write_error, write_json, write_response};
use crate::api::ApiHandler;
use crate::observability::{log_event, log_event_with_fields, Event, Logger, MetricsRegistry};
use crate::store::{journal_path, AnyBackend, FileBackend, MemoryBackend};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Start { config } => start(&config),
        Command::Exec { config } => exec(&config),
    }
}

/// Initialize a new data directory
///
/// Creates the data directory and an empty journal. Writes no entries.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    init_data_dir(&config)?;

    let mut stdout = io::stdout();
    write_response(
        &mut stdout,
        json!({"initialized": true, "data_dir": config.data_dir}),
    )
}

/// Serve requests from stdin until end of input
pub fn start(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let handler = boot(&config)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    serve(&handler, stdin.lock(), &mut stdout)?;

    log_event(Event::ShutdownComplete);
    Ok(())
}

/// Execute a single request from stdin
pub fn exec(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let handler = boot(&config)?;

    let stdin = io::stdin();
    let request = read_request(&mut stdin.lock())?;
    let response = handler.handle(&request);

    let mut stdout = io::stdout();
    write_json(&mut stdout, &response.to_json())
}

/// Creates the data directory layout.
///
/// # Errors
///
/// `FORGE_CLI_ALREADY_INITIALIZED` if a journal already exists.
pub fn init_data_dir(config: &Config) -> CliResult<()> {
    let data_dir = config.data_path();
    if is_initialized(data_dir) {
        return Err(CliError::AlreadyInitialized(data_dir.to_path_buf()));
    }

    let journal = journal_path(data_dir);
    if let Some(dir) = journal.parent() {
        fs::create_dir_all(dir).map_err(|source| CliError::Layout {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    fs::File::create(&journal).map_err(|source| CliError::Layout {
        path: journal.clone(),
        source,
    })?;

    Ok(())
}

/// Opens the configured store and builds the request handler.
pub fn boot(config: &Config) -> CliResult<ApiHandler<AnyBackend>> {
    Logger::set_min_severity(config.min_severity()?);
    log_event(Event::BootStart);

    let backend_label = match config.backend {
        BackendKind::File => "file",
        BackendKind::Memory => "memory",
    };
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("backend", backend_label), ("data_dir", config.data_dir.as_str())],
    );

    let metrics = Arc::new(MetricsRegistry::new());
    let backend = match config.backend {
        BackendKind::File => {
            let data_dir = config.data_path();
            if !is_initialized(data_dir) {
                return Err(CliError::NotInitialized(data_dir.to_path_buf()));
            }
            let backend = FileBackend::open(data_dir)?;
            metrics.add_journal_entries_replayed(backend.replay_summary().entries);
            AnyBackend::File(backend)
        }
        BackendKind::Memory => AnyBackend::Memory(MemoryBackend::new()),
    };

    let handler = ApiHandler::new(Arc::new(backend), metrics);
    log_event(Event::BootComplete);
    Ok(handler)
}

/// Request loop: one JSON request per input line, one response per output
/// line.
pub fn serve<R: BufRead, W: Write>(
    handler: &ApiHandler<AnyBackend>,
    input: R,
    output: &mut W,
) -> CliResult<()> {
    log_event(Event::Serving);

    for line in read_requests(input) {
        match line {
            Ok(request) => {
                let response = handler.handle(&request);
                write_json(output, &response.to_json())?;
            }
            Err(e) => {
                // Unreadable input ends the session
                write_error(output, e.code(), &e.to_string())?;
                return Err(e);
            }
        }
    }
    Ok(())
}

fn is_initialized(data_dir: &Path) -> bool {
    journal_path(data_dir).exists()
}
