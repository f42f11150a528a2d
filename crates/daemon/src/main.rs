// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! xj executor daemon (xjd)
//!
//! Hosts the scheduler-facing HTTP server and the dispatch engine. Started
//! standalone it serves an empty handler registry; real deployments embed
//! [`xj_daemon::Runner`] and register handlers before calling `serve`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use xj_adapters::HttpAdminClient;
use xj_core::ExecutorConfig;
use xj_daemon::{build_log_store, Runner};
use xj_engine::HandlerRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("xjd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("xjd {}", env!("CARGO_PKG_VERSION"));
                println!("xj executor daemon - receives run requests from an XXL-JOB admin");
                println!();
                println!("USAGE:");
                println!("    xjd [CONFIG]");
                println!();
                println!("CONFIG is a TOML file (default: xj.toml, or $XJ_CONFIG).");
                println!("XJ_* environment variables override individual settings.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            path => {
                return run(PathBuf::from(path)).await;
            }
        }
    }

    let path = std::env::var("XJ_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("xj.toml"));
    run(path).await
}

async fn run(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = ExecutorConfig::load(&config_path)?;

    // Rotate the daemon log before the appender opens it.
    rotate_log_if_needed(&config.executor_log_path);
    let _log_guard = setup_logging(&config)?;

    info!(
        app_name = %config.app_name,
        admin = %config.admin_base_url,
        backend = %config.log_backend,
        "starting executor"
    );

    // Startup order: log store, admin client, engine, server.
    let logs = build_log_store(&config).await?;
    let admin = Arc::new(HttpAdminClient::new(
        config.admin_base_url.clone(),
        config.access_token.clone(),
    )?);
    let registry = Arc::new(HandlerRegistry::new());

    let runner = Runner::new(config, registry, admin, logs);
    runner.serve(shutdown_signal()).await?;

    info!("executor stopped");
    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::error!(error = %e, "failed to install SIGTERM handler");
            return std::future::pending().await;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(sigint) => sigint,
        Err(e) => {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }
}

/// Maximum daemon log size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (xj.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `xj.log` to `xj.log.1` to `xj.log.2` to `xj.log.3`, deleting
/// the oldest. Best-effort: rotation failures are silently ignored so the
/// daemon still starts.
fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    // Shift older rotations: .3 is deleted, .2->.3, .1->.2
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    // Rotate current log -> .1
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    config: &ExecutorConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_path = &config.executor_log_path;
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Rotation happens at startup via rotate_log_if_needed.
    let directory = log_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = log_path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("executor_log_path has no file name: {}", log_path.display()),
        )
    })?;
    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer))
        .init();

    Ok(guard)
}
