// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server assembly: binds the transports and spawns the coordinator.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{error, info};

use mcpool_core::{Clock, SystemClock, ToolRegistry};

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::event::Event;
use crate::http;
use crate::listener::Listener;
use crate::pool::PoolError;
use crate::protocol::ServerStats;

/// Coordinator inbox depth. Submissions past this block the transport
/// task briefly; admission control proper is the task queue bound.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bind failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker pool failed to start: {0}")]
    Pool(#[from] PoolError),

    #[error("server is shutting down")]
    Unavailable,
}

/// Running server: bound addresses plus shutdown and stats access.
pub struct ServerHandle {
    pub tcp_addr: SocketAddr,
    pub http_addr: SocketAddr,
    shutdown: Arc<Notify>,
    events: mpsc::Sender<Event>,
}

impl ServerHandle {
    /// Ask every component to stop. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }

    /// Snapshot of the coordinator's stats.
    pub async fn stats(&self) -> Result<ServerStats, ServerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.events
            .send(Event::Stats { reply: reply_tx })
            .await
            .map_err(|_| ServerError::Unavailable)?;
        reply_rx.await.map_err(|_| ServerError::Unavailable)
    }
}

/// Start the server with the built-in tool catalog.
pub async fn start(config: Config) -> Result<ServerHandle, ServerError> {
    start_with_registry(config, ToolRegistry::builtin()).await
}

/// Start the server with a caller-supplied tool catalog.
pub async fn start_with_registry(
    config: Config,
    registry: ToolRegistry,
) -> Result<ServerHandle, ServerError> {
    let registry = Arc::new(registry);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let shutdown = Arc::new(Notify::new());
    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    let coordinator = Coordinator::new(
        config.clone(),
        Arc::clone(&registry),
        events_tx.clone(),
        Arc::clone(&clock),
    )?;
    tokio::spawn(coordinator.run(events_rx, Arc::clone(&shutdown)));

    let tcp_listener = TcpListener::bind(config.tcp_addr).await?;
    let tcp_addr = tcp_listener.local_addr()?;
    let listener = Listener::new(
        tcp_listener,
        events_tx.clone(),
        Arc::clone(&registry),
        Arc::clone(&clock),
        Arc::clone(&shutdown),
    );
    tokio::spawn(listener.run());

    let http_listener = TcpListener::bind(config.http_addr).await?;
    let http_addr = http_listener.local_addr()?;
    let app = http::router(events_tx.clone(), Arc::clone(&clock));
    let http_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        let serve = axum::serve(http_listener, app)
            .with_graceful_shutdown(async move { http_shutdown.notified().await });
        if let Err(e) = serve.await {
            error!("http server error: {e}");
        }
    });

    info!(%tcp_addr, %http_addr, workers = config.effective_workers(), "server started");
    Ok(ServerHandle {
        tcp_addr,
        http_addr,
        shutdown,
        events: events_tx,
    })
}
