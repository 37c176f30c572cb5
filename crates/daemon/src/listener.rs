// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP listener task.
//!
//! Accepts connections and handles each in a spawned task without blocking
//! the coordinator. The wire format is one JSON envelope per line, in both
//! directions. `tools/list` is answered inline from the shared registry;
//! `server/stats` round-trips through the coordinator; `tools/call` is
//! forwarded as an event and answered whenever the task finishes, so a
//! client may have any number of calls in flight on one connection.

use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, error, info, warn};

use mcpool_core::{Clock, ConnectionId, ToolRegistry, TransportKind};

use crate::event::{Event, ResponseSink};
use crate::protocol::{
    self, Response, ToolListResult, METHOD_SERVER_STATS, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("coordinator unavailable")]
    CoordinatorGone,
}

/// Accept loop over the TCP transport.
pub struct Listener {
    listener: TcpListener,
    events: mpsc::Sender<Event>,
    registry: Arc<ToolRegistry>,
    clock: Arc<dyn Clock>,
    shutdown: Arc<Notify>,
}

impl Listener {
    pub fn new(
        listener: TcpListener,
        events: mpsc::Sender<Event>,
        registry: Arc<ToolRegistry>,
        clock: Arc<dyn Clock>,
        shutdown: Arc<Notify>,
    ) -> Self {
        Self {
            listener,
            events,
            registry,
            clock,
            shutdown,
        }
    }

    /// Run the accept loop until shutdown, spawning a task per connection.
    pub async fn run(self) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let id = ConnectionId::generate(TransportKind::Tcp, self.clock.now_ms());
                        info!(connection = %id, %peer, "tcp connection accepted");
                        let events = self.events.clone();
                        let registry = Arc::clone(&self.registry);
                        tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, id.clone(), events, registry).await
                            {
                                warn!(connection = %id, "connection error: {e}");
                            }
                        });
                    }
                    Err(e) => error!("accept error: {e}"),
                },
                _ = self.shutdown.notified() => {
                    info!("tcp listener stopping");
                    break;
                }
            }
        }
    }
}

/// Handle one client connection until EOF or error.
async fn handle_connection(
    stream: TcpStream,
    connection_id: ConnectionId,
    events: mpsc::Sender<Event>,
    registry: Arc<ToolRegistry>,
) -> Result<(), ConnectionError> {
    let (reader, mut writer) = stream.into_split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Response>();

    events
        .send(Event::ConnectionOpened {
            id: connection_id.clone(),
            sink: ResponseSink::Stream(reply_tx.clone()),
        })
        .await
        .map_err(|_| ConnectionError::CoordinatorGone)?;

    // Responses come from both this task (inline replies) and the
    // coordinator (task results), serialized by a single writer task.
    let writer_task = tokio::spawn(async move {
        while let Some(response) = reply_rx.recv().await {
            let line = match protocol::encode(&response) {
                Ok(line) => line,
                Err(e) => {
                    error!("response encoding failed: {e}");
                    continue;
                }
            };
            if writer.write_all(line.as_bytes()).await.is_err()
                || writer.write_all(b"\n").await.is_err()
            {
                break;
            }
        }
    });

    let mut lines = BufReader::new(reader).lines();
    let result = loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Err(e) =
                    handle_line(line, &connection_id, &events, &registry, &reply_tx).await
                {
                    break Err(e);
                }
            }
            Ok(None) => {
                debug!(connection = %connection_id, "client disconnected");
                break Ok(());
            }
            Err(e) => break Err(ConnectionError::Io(e)),
        }
    };

    let _ = events
        .send(Event::ConnectionClosed {
            id: connection_id.clone(),
        })
        .await;

    // Once the coordinator drops its sink clone the writer drains whatever
    // is buffered and exits.
    drop(reply_tx);
    let _ = writer_task.await;
    result
}

/// Process one request line.
///
/// Malformed input is answered with an error envelope, never by dropping
/// the connection; only losing the coordinator ends the session.
async fn handle_line(
    line: &str,
    connection_id: &ConnectionId,
    events: &mpsc::Sender<Event>,
    registry: &ToolRegistry,
    replies: &mpsc::UnboundedSender<Response>,
) -> Result<(), ConnectionError> {
    let request = match protocol::decode_line(line) {
        Ok(request) => request,
        Err(e) => {
            let _ = replies.send(Response::error(serde_json::Value::Null, e.to_string()));
            return Ok(());
        }
    };

    debug!(connection = %connection_id, method = %request.method, "request received");

    match request.method.as_str() {
        METHOD_TOOLS_LIST => {
            let result = ToolListResult {
                tools: registry.list(),
            };
            let response = match serde_json::to_value(result) {
                Ok(value) => Response::ok(request.id, value),
                Err(e) => Response::error(request.id, format!("internal error: {e}")),
            };
            let _ = replies.send(response);
        }

        METHOD_SERVER_STATS => {
            let (tx, rx) = oneshot::channel();
            events
                .send(Event::Stats { reply: tx })
                .await
                .map_err(|_| ConnectionError::CoordinatorGone)?;
            let stats = rx.await.map_err(|_| ConnectionError::CoordinatorGone)?;
            let response = match serde_json::to_value(stats) {
                Ok(value) => Response::ok(request.id, value),
                Err(e) => Response::error(request.id, format!("internal error: {e}")),
            };
            let _ = replies.send(response);
        }

        METHOD_TOOLS_CALL => match protocol::call_params(request.params) {
            Ok(params) => {
                events
                    .send(Event::ToolCall {
                        request_id: request.id,
                        name: params.name,
                        args: params.arguments,
                        connection_id: connection_id.clone(),
                    })
                    .await
                    .map_err(|_| ConnectionError::CoordinatorGone)?;
            }
            Err(e) => {
                let _ = replies.send(Response::error(request.id, e.to_string()));
            }
        },

        other => {
            let _ = replies.send(Response::error(
                request.id,
                format!("unknown method: {other}"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
