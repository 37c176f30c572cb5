// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client protocol: JSON-RPC-style envelopes and response DTOs.
//!
//! Wire format on TCP: one JSON envelope per line. The HTTP transport
//! reuses the same [`Response`] envelope as its body.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use mcpool_core::ToolInfo;

/// Synchronous reflection call listing available tools.
pub const METHOD_TOOLS_LIST: &str = "tools/list";
/// Enqueue a tool execution; the response arrives when the task finishes.
pub const METHOD_TOOLS_CALL: &str = "tools/call";
/// Queue-bypassing pool/queue statistics.
pub const METHOD_SERVER_STATS: &str = "server/stats";

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid params: {0}")]
    InvalidParams(String),
}

/// Request envelope.
///
/// `id` is a client-chosen correlation token echoed back verbatim; clients
/// with several requests in flight on one connection must match responses
/// by it, not by arrival order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Params of a `tools/call` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Body of `POST /call-tool`, the HTTP shorthand for `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallToolBody {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// Response envelope: either `result` or `error`, correlated by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

fn jsonrpc_version() -> String {
    "2.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub message: String,
}

impl Response {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: None,
            error: Some(ErrorBody {
                message: message.into(),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Result payload of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolListResult {
    pub tools: Vec<ToolInfo>,
}

/// Per-worker slice of [`ServerStats`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerStatus {
    pub id: usize,
    pub busy: bool,
    pub tasks_completed: u64,
    pub current_task: Option<u64>,
    /// False while the slot waits out its restart backoff.
    pub alive: bool,
}

/// Result payload of `server/stats` and `GET /stats`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerStats {
    pub uptime_ms: u64,
    pub total_requests: u64,
    pub active_connections: usize,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub queue_length: usize,
    pub active_tasks: usize,
    pub workers: Vec<WorkerStatus>,
}

/// Payload of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Health {
    pub status: String,
    pub uptime_ms: u64,
    pub workers: usize,
    pub queue_length: usize,
}

/// Parse one line of the TCP transport into a request envelope.
pub fn decode_line(line: &str) -> Result<Request, ProtocolError> {
    Ok(serde_json::from_str(line)?)
}

/// Encode a response as a single JSON line (without the trailing newline).
pub fn encode(response: &Response) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(response)?)
}

/// Interpret a request's params as `tools/call` params.
pub fn call_params(params: Value) -> Result<CallParams, ProtocolError> {
    serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParams(e.to_string()))
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
