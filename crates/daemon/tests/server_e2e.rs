// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tests over real sockets.
//!
//! Each test binds both transports on ephemeral ports with instant tool
//! latency and a two-worker pool, then talks to the server the way a real
//! client would: line-delimited JSON over TCP, plain HTTP/1.1 requests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::net::SocketAddr;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use mcpool_daemon::{server, Config, LatencyWindow, ServerHandle};

async fn start_server() -> ServerHandle {
    let config = Config {
        tcp_addr: "127.0.0.1:0".parse().unwrap(),
        http_addr: "127.0.0.1:0".parse().unwrap(),
        worker_count: Some(2),
        latency: LatencyWindow::none(),
        ..Config::default()
    };
    server::start(config).await.expect("server start")
}

struct TcpClient {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl TcpClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }

    async fn send(&mut self, request: Value) {
        let mut line = request.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.expect("send");
    }

    async fn recv(&mut self) -> Value {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.expect("recv");
        serde_json::from_str(&line).expect("response json")
    }
}

/// Minimal HTTP/1.1 exchange; `Connection: close` lets us read to EOF.
async fn http_request(addr: SocketAddr, method: &str, path: &str, body: Option<&str>) -> (u16, Value) {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let body = body.unwrap_or("");
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.expect("send");

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.expect("read");
    let text = String::from_utf8(raw).expect("utf8");

    let status: u16 = text
        .split_whitespace()
        .nth(1)
        .expect("status line")
        .parse()
        .expect("status code");
    let payload = text.split("\r\n\r\n").nth(1).unwrap_or("").trim();
    let json = if payload.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(payload).expect("body json")
    };
    (status, json)
}

#[tokio::test]
async fn tcp_lists_tools_and_executes_a_call() {
    let handle = start_server().await;
    let mut client = TcpClient::connect(handle.tcp_addr).await;

    client
        .send(json!({"id": 1, "method": "tools/list"}))
        .await;
    let listing = client.recv().await;
    assert_eq!(listing["id"], json!(1));
    let names: Vec<&str> = listing["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"echo"));
    assert!(names.contains(&"prime_factorization"));

    // Reflection bypasses the queue: nothing enqueued, nothing counted.
    client
        .send(json!({"id": "s1", "method": "server/stats"}))
        .await;
    let stats = client.recv().await;
    assert_eq!(stats["result"]["queue_length"], json!(0));
    assert_eq!(stats["result"]["total_requests"], json!(0));
    assert_eq!(stats["result"]["active_tasks"], json!(0));

    client
        .send(json!({
            "id": 2,
            "method": "tools/call",
            "params": {"name": "fibonacci", "arguments": {"n": 10}}
        }))
        .await;
    let response = client.recv().await;
    assert_eq!(response["id"], json!(2));
    assert_eq!(
        response["result"]["content"][0]["text"],
        json!("Fibonacci(10) = 55")
    );

    handle.shutdown();
}

#[tokio::test]
async fn tcp_responses_are_correlated_by_request_id() {
    let handle = start_server().await;
    let mut client = TcpClient::connect(handle.tcp_addr).await;

    client
        .send(json!({
            "id": "first",
            "method": "tools/call",
            "params": {"name": "echo", "arguments": {"text": "one"}}
        }))
        .await;
    client
        .send(json!({
            "id": "second",
            "method": "tools/call",
            "params": {"name": "echo", "arguments": {"text": "two"}}
        }))
        .await;

    // Both calls run on the two-worker pool; match replies by id, not by
    // arrival order.
    let mut by_id = std::collections::HashMap::new();
    for _ in 0..2 {
        let response = client.recv().await;
        by_id.insert(
            response["id"].as_str().unwrap().to_string(),
            response["result"]["content"][0]["text"]
                .as_str()
                .unwrap()
                .to_string(),
        );
    }
    assert_eq!(by_id["first"], "one");
    assert_eq!(by_id["second"], "two");

    handle.shutdown();
}

#[tokio::test]
async fn tcp_reports_tool_failures_without_closing_the_connection() {
    let handle = start_server().await;
    let mut client = TcpClient::connect(handle.tcp_addr).await;

    client
        .send(json!({
            "id": 1,
            "method": "tools/call",
            "params": {"name": "fibonacci", "arguments": {"n": 9999}}
        }))
        .await;
    let response = client.recv().await;
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("n too large"));

    // Connection survives; the next call works.
    client
        .send(json!({
            "id": 2,
            "method": "tools/call",
            "params": {"name": "echo", "arguments": {"text": "still here"}}
        }))
        .await;
    let response = client.recv().await;
    assert_eq!(response["result"]["content"][0]["text"], json!("still here"));

    handle.shutdown();
}

#[tokio::test]
async fn tcp_server_stats_counts_completed_work() {
    let handle = start_server().await;
    let mut client = TcpClient::connect(handle.tcp_addr).await;

    client
        .send(json!({
            "id": 1,
            "method": "tools/call",
            "params": {"name": "add", "arguments": {"a": 1, "b": 1}}
        }))
        .await;
    client.recv().await;

    client
        .send(json!({"id": 2, "method": "server/stats"}))
        .await;
    let response = client.recv().await;
    let stats = &response["result"];
    assert_eq!(stats["total_requests"], json!(1));
    assert_eq!(stats["completed_tasks"], json!(1));
    assert_eq!(stats["active_connections"], json!(1));
    assert_eq!(stats["workers"].as_array().unwrap().len(), 2);

    handle.shutdown();
}

#[tokio::test]
async fn http_call_tool_returns_the_result() {
    let handle = start_server().await;

    let (status, body) = http_request(
        handle.http_addr,
        "POST",
        "/call-tool",
        Some(r#"{"name": "get_weather", "args": {"location": "Oslo"}}"#),
    )
    .await;

    assert_eq!(status, 200);
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Weather in Oslo:"));

    handle.shutdown();
}

#[tokio::test]
async fn http_stats_and_health_respond() {
    let handle = start_server().await;

    let (status, stats) = http_request(handle.http_addr, "GET", "/stats", None).await;
    assert_eq!(status, 200);
    assert_eq!(stats["workers"].as_array().unwrap().len(), 2);
    assert_eq!(stats["total_requests"], json!(0));

    let (status, health) = http_request(handle.http_addr, "GET", "/health", None).await;
    assert_eq!(status, 200);
    assert_eq!(health["status"], json!("ok"));
    assert_eq!(health["workers"], json!(2));

    handle.shutdown();
}

#[tokio::test]
async fn http_unknown_path_is_a_404() {
    let handle = start_server().await;

    let (status, body) = http_request(handle.http_addr, "GET", "/no-such-route", None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], json!("not found"));

    handle.shutdown();
}

#[tokio::test]
async fn transports_share_one_coordinator() {
    let handle = start_server().await;

    // Work done over HTTP shows up in stats queried over TCP.
    let (status, _) = http_request(
        handle.http_addr,
        "POST",
        "/call-tool",
        Some(r#"{"name": "echo", "args": {"text": "cross"}}"#),
    )
    .await;
    assert_eq!(status, 200);

    let mut client = TcpClient::connect(handle.tcp_addr).await;
    client
        .send(json!({"id": 1, "method": "server/stats"}))
        .await;
    let response = client.recv().await;
    assert_eq!(response["result"]["completed_tasks"], json!(1));

    handle.shutdown();
}
