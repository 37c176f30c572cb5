// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use tower::ServiceExt;

use mcpool_core::{SystemClock, ToolRegistry};

use crate::protocol::{Response, WorkerStatus};

fn sample_stats() -> ServerStats {
    ServerStats {
        uptime_ms: 12_000,
        total_requests: 10,
        active_connections: 2,
        completed_tasks: 7,
        failed_tasks: 1,
        queue_length: 3,
        active_tasks: 2,
        workers: vec![
            WorkerStatus {
                id: 0,
                busy: true,
                tasks_completed: 4,
                current_task: Some(9),
                alive: true,
            },
            WorkerStatus {
                id: 1,
                busy: false,
                tasks_completed: 3,
                current_task: None,
                alive: true,
            },
        ],
    }
}

/// Stand-in coordinator: executes calls inline and serves canned stats.
fn spawn_fake_coordinator(mut events: mpsc::Receiver<Event>) {
    tokio::spawn(async move {
        let registry = ToolRegistry::builtin();
        let mut sinks: HashMap<ConnectionId, ResponseSink> = HashMap::new();
        while let Some(event) = events.recv().await {
            match event {
                Event::ConnectionOpened { id, sink } => {
                    sinks.insert(id, sink);
                }
                Event::ToolCall {
                    request_id,
                    name,
                    args,
                    connection_id,
                } => {
                    let response = match registry.execute(&name, &args) {
                        Ok(result) => {
                            Response::ok(request_id, serde_json::to_value(result).unwrap())
                        }
                        Err(e) => Response::error(request_id, e.to_string()),
                    };
                    if let Some(ResponseSink::Once(tx)) = sinks.remove(&connection_id) {
                        let _ = tx.send(response);
                    }
                }
                Event::Stats { reply } => {
                    let _ = reply.send(sample_stats());
                }
                _ => {}
            }
        }
    });
}

fn app() -> Router {
    let (events_tx, events_rx) = mpsc::channel(16);
    spawn_fake_coordinator(events_rx);
    router(events_tx, Arc::new(SystemClock))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn call_tool_returns_the_tool_result() {
    let response = app()
        .oneshot(
            Request::post("/call-tool")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"name": "add", "args": {"a": 2, "b": 40}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["result"]["content"][0]["text"],
        json!("The sum of 2 and 40 is 42")
    );
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn call_tool_surfaces_tool_errors_in_the_envelope() {
    let response = app()
        .oneshot(
            Request::post("/call-tool")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name": "nonexistent", "args": {}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], json!("Tool not found: nonexistent"));
}

#[tokio::test]
async fn call_tool_rejects_a_body_without_a_name() {
    let response = app()
        .oneshot(
            Request::post("/call-tool")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"args": {}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn stats_reports_the_full_snapshot() {
    let response = app()
        .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_requests"], json!(10));
    assert_eq!(body["queue_length"], json!(3));
    assert_eq!(body["workers"].as_array().unwrap().len(), 2);
    assert_eq!(body["workers"][0]["busy"], json!(true));
}

#[tokio::test]
async fn health_summarizes_the_snapshot() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["workers"], json!(2));
    assert_eq!(body["queue_length"], json!(3));
}

#[tokio::test]
async fn unknown_paths_get_a_404() {
    let response = app()
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("not found"));
}
