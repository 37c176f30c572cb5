// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport.
//!
//! A thin axum app over the same coordinator as the TCP listener. Each
//! `POST /call-tool` is a one-shot connection: the handler registers a
//! [`ResponseSink::Once`], forwards the call, and holds the request open
//! until the task finishes. `GET /stats` and `GET /health` bypass the
//! queue entirely.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use mcpool_core::{Clock, ConnectionId, TransportKind};

use crate::event::{Event, ResponseSink};
use crate::protocol::{CallToolBody, Health, ServerStats};

#[derive(Clone)]
pub struct HttpState {
    events: mpsc::Sender<Event>,
    clock: Arc<dyn Clock>,
}

/// Build the HTTP app.
pub fn router(events: mpsc::Sender<Event>, clock: Arc<dyn Clock>) -> Router {
    let state = HttpState { events, clock };
    Router::new()
        .route("/call-tool", post(call_tool))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(state)
}

/// `POST /call-tool`: run a tool and answer with its actual result.
///
/// The body is `{"name": ..., "args": ...}`; the response is the same
/// envelope the TCP transport uses, with a null `id` since HTTP needs no
/// correlation token.
async fn call_tool(State(state): State<HttpState>, Json(body): Json<CallToolBody>) -> HttpResponse {
    let connection_id = ConnectionId::generate(TransportKind::Http, state.clock.now_ms());
    debug!(connection = %connection_id, tool = %body.name, "http call");

    let (reply_tx, reply_rx) = oneshot::channel();
    let opened = state
        .events
        .send(Event::ConnectionOpened {
            id: connection_id.clone(),
            sink: ResponseSink::Once(reply_tx),
        })
        .await;
    if opened.is_err() {
        return unavailable();
    }

    let submitted = state
        .events
        .send(Event::ToolCall {
            request_id: Value::Null,
            name: body.name,
            args: body.args,
            connection_id,
        })
        .await;
    if submitted.is_err() {
        return unavailable();
    }

    match reply_rx.await {
        Ok(response) => Json(response).into_response(),
        Err(_) => unavailable(),
    }
}

/// `GET /stats`: full pool and queue statistics.
async fn stats(State(state): State<HttpState>) -> HttpResponse {
    match fetch_stats(&state).await {
        Some(stats) => Json(stats).into_response(),
        None => unavailable(),
    }
}

/// `GET /health`: liveness summary derived from the same snapshot.
async fn health(State(state): State<HttpState>) -> HttpResponse {
    match fetch_stats(&state).await {
        Some(stats) => Json(Health {
            status: "ok".to_string(),
            uptime_ms: stats.uptime_ms,
            workers: stats.workers.len(),
            queue_length: stats.queue_length,
        })
        .into_response(),
        None => unavailable(),
    }
}

async fn not_found() -> HttpResponse {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
}

async fn fetch_stats(state: &HttpState) -> Option<ServerStats> {
    let (reply_tx, reply_rx) = oneshot::channel();
    state
        .events
        .send(Event::Stats { reply: reply_tx })
        .await
        .ok()?;
    reply_rx.await.ok()
}

fn unavailable() -> HttpResponse {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": "service unavailable"})),
    )
        .into_response()
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
