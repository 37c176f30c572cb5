// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mcpoold
//!
//! Worker-pool task dispatcher serving tool calls over TCP (line-delimited
//! JSON envelopes) and HTTP.

use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use mcpool_daemon::{server, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before anything else
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("mcpoold {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("mcpoold {}", env!("CARGO_PKG_VERSION"));
                println!("Worker-pool task dispatcher serving tool calls over TCP and HTTP");
                println!();
                println!("USAGE:");
                println!("    mcpoold");
                println!();
                println!("Configuration is taken from MCPOOL_* environment variables:");
                println!("    MCPOOL_TCP_ADDR         TCP bind address (default 127.0.0.1:3000)");
                println!("    MCPOOL_HTTP_ADDR        HTTP bind address (default 127.0.0.1:3001)");
                println!("    MCPOOL_WORKERS          Exact pool size (default: CPU count, capped)");
                println!("    MCPOOL_MAX_WORKERS      Pool size cap (default 8)");
                println!("    MCPOOL_QUEUE_CAPACITY   Pending-task bound (default 1024)");
                println!("    MCPOOL_TASK_TIMEOUT_MS  Task deadline, 0 disables (default 30000)");
                println!("    MCPOOL_TOOL_LATENCY_MS  Simulated latency, 'min-max' or fixed");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: mcpoold [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    setup_logging();

    let config = Config::load()?;
    let handle = match server::start(config).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("failed to start server: {e}");
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // Periodic stats line, same cadence the stats endpoint would show.
    let mut stats_tick = tokio::time::interval(Duration::from_secs(30));
    stats_tick.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
            _ = stats_tick.tick() => {
                match handle.stats().await {
                    Ok(stats) => info!(
                        total_requests = stats.total_requests,
                        completed = stats.completed_tasks,
                        failed = stats.failed_tasks,
                        queued = stats.queue_length,
                        active = stats.active_tasks,
                        connections = stats.active_connections,
                        "server stats"
                    ),
                    Err(e) => warn!("stats query failed: {e}"),
                }
            }
        }
    }

    handle.shutdown();
    // Give in-flight writers a moment to flush before the process exits.
    tokio::time::sleep(Duration::from_millis(100)).await;
    info!("shutdown complete");
    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
