// crates/slam-telemetry-cli/src/main.rs
// ============================================================================
// Module: SLAM Telemetry CLI
// Description: Command-line host for the SLAM run recorder.
// Purpose: Wire configuration, logging, the SQLite recorder, and the command
//          dispatcher into runnable commands.
// Dependencies: clap, slam-telemetry-{config,core,store-sqlite}, serde_json,
//               thiserror, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! `slam-telemetry` validates configuration, routes control messages from
//! stdin (`listen`), replays recorded sessions (`replay`), and prints stored
//! run summaries (`summary`). Logs go to stderr so stdout stays
//! machine-readable; every stdout line is a JSON value or a status word.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use serde_json::json;
use slam_telemetry_cli::replay::ReplaySession;
use slam_telemetry_cli::tracker::StandInTracker;
use slam_telemetry_config::TelemetryConfig;
use slam_telemetry_core::CommandDispatcher;
use slam_telemetry_core::DispatchOutcome;
use slam_telemetry_core::RunId;
use slam_telemetry_store_sqlite::SqliteRecorderError;
use slam_telemetry_store_sqlite::SqliteRunRecorder;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: CLI Arguments
// ============================================================================

/// Top-level CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "slam-telemetry",
    version,
    about = "Run telemetry recorder for SLAM tracking sessions.",
    disable_help_subcommand = true
)]
struct Cli {
    /// Selected subcommand.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Route control messages read from stdin, one per line.
    Listen(ListenCommand),
    /// Replay a JSON-lines tracking session through the recorder.
    Replay(ReplayCommand),
    /// Print stored run summaries as JSON.
    Summary(SummaryCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigArgs),
}

/// Configuration file selection shared by all commands.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Config file path (defaults to SLAM_TELEMETRY_CONFIG or slam-telemetry.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `listen`.
#[derive(Args, Debug)]
struct ListenCommand {
    /// Configuration file selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// Arguments for `replay`.
#[derive(Args, Debug)]
struct ReplayCommand {
    /// JSON-lines event log to replay.
    #[arg(long, value_name = "FILE")]
    input: PathBuf,
    /// Configuration file selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// Arguments for `summary`.
#[derive(Args, Debug)]
struct SummaryCommand {
    /// Run id to print; all runs when omitted.
    #[arg(long, value_name = "ID")]
    run: Option<String>,
    /// Configuration file selection.
    #[command(flatten)]
    config: ConfigArgs,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// User-facing message.
    message: String,
}

impl CliError {
    /// Creates a new CLI error.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Runs the CLI and maps failures to an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the selected command.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Config {
            command: ConfigCommand::Validate(args),
        } => command_config_validate(&args),
        Commands::Listen(command) => command_listen(&command),
        Commands::Replay(command) => command_replay(&command),
        Commands::Summary(command) => command_summary(&command),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Loads and validates configuration, printing `config ok` on success.
fn command_config_validate(args: &ConfigArgs) -> CliResult<ExitCode> {
    load_config(args.config.as_deref())?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Routes stdin lines through the command dispatcher.
fn command_listen(command: &ListenCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.config.as_deref())?;
    init_logging(&config.logging.filter)?;
    let recorder = Arc::new(SqliteRunRecorder::open(config.to_recorder_config()));
    let tracker = Arc::new(StandInTracker::new());
    let dispatcher = CommandDispatcher::new(recorder, tracker);
    info!("listening for control messages on stdin");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|err| CliError::new(format!("failed to read stdin: {err}")))?;
        if line.trim().is_empty() {
            continue;
        }
        let outcome = dispatcher.dispatch(&line);
        write_stdout_line(&outcome_line(&outcome))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Replays a JSON-lines session log and prints the replay report.
fn command_replay(command: &ReplayCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.config.as_deref())?;
    init_logging(&config.logging.filter)?;
    let file = File::open(&command.input).map_err(|err| {
        CliError::new(format!("failed to open replay input {}: {err}", command.input.display()))
    })?;
    let recorder = Arc::new(SqliteRunRecorder::open(config.to_recorder_config()));
    let session = ReplaySession::new(recorder, Arc::new(StandInTracker::new()));
    let report = session
        .run(BufReader::new(file), |outcome| write_stdout_line(&outcome_line(outcome)))
        .map_err(|err| CliError::new(err.to_string()))?;
    info!(events = report.events, commands = report.commands, "replay finished");
    write_json(&json!({ "replay": report }))?;
    Ok(ExitCode::SUCCESS)
}

/// Prints one stored summary, or all of them.
fn command_summary(command: &SummaryCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.config.as_deref())?;
    init_logging(&config.logging.filter)?;
    let recorder = SqliteRunRecorder::try_open(config.to_recorder_config())
        .map_err(|err| CliError::new(format!("failed to open telemetry store: {err}")))?;
    match command.run.as_deref() {
        Some(raw) => {
            let run_id = RunId::parse(raw)
                .map_err(|err| CliError::new(format!("invalid run id {raw}: {err}")))?;
            let summary = recorder
                .global_summary(&run_id)
                .map_err(store_error)?
                .ok_or_else(|| CliError::new(format!("no summary recorded for run {raw}")))?;
            write_json(&summary)?;
        }
        None => {
            let summaries = recorder.global_summaries().map_err(store_error)?;
            write_json(&summaries)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Setup Helpers
// ============================================================================

/// Loads configuration, mapping failures to CLI errors.
fn load_config(path: Option<&Path>) -> CliResult<TelemetryConfig> {
    TelemetryConfig::load(path).map_err(|err| CliError::new(err.to_string()))
}

/// Installs the stderr log subscriber; `RUST_LOG` overrides the config filter.
fn init_logging(filter: &str) -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .map_err(|err| CliError::new(format!("invalid log filter: {err}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| CliError::new(format!("failed to install logger: {err}")))
}

/// Formats a store read failure.
fn store_error(err: SqliteRecorderError) -> CliError {
    CliError::new(format!("telemetry store read failed: {err}"))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Renders a dispatch outcome as a single JSON line.
fn outcome_line(outcome: &DispatchOutcome) -> String {
    let mut value = json!({
        "outcome": outcome.label(),
        "detail": outcome.to_string(),
    });
    if let DispatchOutcome::RunFinalized(length) = outcome {
        value["sequence_length_ms"] = json!(length.to_millis().value());
    }
    value.to_string()
}

/// Writes a value to stdout as one JSON line.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string(value)
        .map_err(|err| CliError::new(format!("failed to encode json: {err}")))?;
    write_stdout_line(&text).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
