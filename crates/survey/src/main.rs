//! `survey`: command-line front end for the building survey desk.
//!
//! One-shot commands fetch, print and exit. `watch` keeps a session
//! mounted and streams notifications until Ctrl-C.

mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::ffi::OsStr;
use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use survey_core::Session;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Held until exit so buffered log lines are flushed.
    let _guard = init_tracing(cli.global.verbose, cli.global.log_file.as_deref());

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Logs go to stderr, or to `log_file` through a non-blocking writer.
fn init_tracing(verbosity: u8, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("survey={level},survey_core={level},survey_api={level}"))
    });

    match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or(OsStr::new("survey.log"));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .init();
            None
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let session_config = config::session_config(&cli.global)?;
    let session = Session::connect(&session_config)?;

    tracing::debug!(command = ?cli.command, backend = %session_config.backend_url, "dispatching command");
    commands::dispatch(cli.command, &session, &cli.global).await
}
