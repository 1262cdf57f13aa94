//! tareas - manage a to-do list from the terminal.
//!
//! Signs in against the tareas backend, keeps the session tokens in the
//! chosen storage and drives the task controller for list and edit commands.

mod cli;
mod commands;
mod output;

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tareas_core::auth::{FileStorage, KeyringStorage, MemoryStorage, TokenStorage};
use tareas_core::{ApiClient, AuthService, Config, LoginRedirect, TaskController};

use cli::{Cli, StorageKind};
use commands::{Context, Reported};

/// Prefix of the daily log files in the data directory
const LOG_FILE_PREFIX: &str = "tareas.log";

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` controls both outputs. Without it, only errors reach stderr
/// while the log file records info and above.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let file_filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_filter(stderr_filter))
        .with(file_layer)
        .init();

    guard
}

/// Tells the user to sign in again once the session cannot be refreshed
struct CliRedirect;

impl LoginRedirect for CliRedirect {
    fn login_required(&self) {
        eprintln!("Your session has expired. Run `tareas login` to sign in again.");
    }
}

fn build_storage(kind: StorageKind, config: &Config) -> anyhow::Result<Arc<dyn TokenStorage>> {
    let storage: Arc<dyn TokenStorage> = match kind {
        StorageKind::Keyring => Arc::new(KeyringStorage::new()),
        StorageKind::File => Arc::new(FileStorage::new(config.data_dir()?)),
        StorageKind::Memory => Arc::new(MemoryStorage::new()),
    };
    Ok(storage)
}

/// Write controller status messages to `out` until the controller is dropped.
/// Every publish is written, so each retry wait shows its own line.
async fn print_status<W: Write>(mut rx: watch::Receiver<Option<String>>, mut out: W) -> W {
    while rx.changed().await.is_ok() {
        let message = rx.borrow_and_update().clone();
        if let Some(text) = message {
            let _ = writeln!(out, "{}", text);
        }
    }
    out
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (mut config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    let log_dir = config
        .data_dir()
        .ok()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let _log_guard = init_tracing(log_dir.as_deref());
    if let Some(e) = config_error {
        warn!("Failed to load config, using defaults: {:#}", e);
    }
    info!(api_url = %config.api_url, "tareas starting");

    let result = run(cli.command, cli.storage, config).await;
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.downcast_ref::<Reported>().is_none() {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: cli::Command, storage: StorageKind, config: Config) -> anyhow::Result<()> {
    let storage = build_storage(storage, &config)?;
    let api = ApiClient::new(config.api_url.clone(), storage)?
        .with_login_redirect(Arc::new(CliRedirect));
    let auth = AuthService::new(api.clone());
    let controller = TaskController::new(api, config.retry);

    let printer = tokio::spawn(print_status(controller.subscribe(), io::stderr()));

    let mut ctx = Context {
        config,
        auth,
        controller,
    };
    let result = commands::run(command, &mut ctx).await;

    // Closing the channel lets the printer flush the final message and exit
    drop(ctx);
    if let Err(e) = printer.await {
        warn!("Status printer failed: {}", e);
    }

    result
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_repeated_retry_messages_each_printed() {
        let (tx, rx) = watch::channel(None);
        let printer = tokio::spawn(print_status(rx, Vec::new()));

        let retrying = "Too many requests. Retrying in 2 seconds...";
        for _ in 0..3 {
            tx.send_replace(Some(retrying.to_string()));
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tx.send_replace(None);
        drop(tx);

        let out = String::from_utf8(printer.await.unwrap()).unwrap();
        assert_eq!(out.lines().filter(|line| *line == retrying).count(), 3);
        assert_eq!(out.lines().count(), 3);
    }
}
