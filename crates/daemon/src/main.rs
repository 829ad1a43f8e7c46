// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleetd`: serves task operations on the IPC socket until interrupted.

use std::process::ExitCode;
use std::sync::Arc;

use fleet_daemon::{env, startup, Config, HandlerRegistry, LifecycleError, Server};
use fleet_engine::NoCommitGate;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fleetd: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("fleetd: failed to open log at {}: {e}", config.log_path.display());
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "daemon exited with error");
            eprintln!("fleetd: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), LifecycleError> {
    let mut result = startup(&config, Arc::new(NoCommitGate)).await?;

    let shutdown = CancellationToken::new();
    let handlers = HandlerRegistry::for_applier(result.daemon.applier.clone());
    let server = tokio::spawn(Server::new(result.listener, handlers, shutdown.clone()).run());
    println!("READY {}", config.socket_path.display());

    tokio::signal::ctrl_c().await?;
    info!("interrupt received");
    shutdown.cancel();
    if let Err(e) = server.await {
        error!(error = %e, "listener task failed");
    }
    result.daemon.shutdown()
}

fn init_logging(config: &Config) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(&config.state_dir)?;
    let file = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::try_new(env::log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
    Ok(guard)
}
