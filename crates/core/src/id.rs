// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifiers for tasks, workers, and client connections.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a task, monotonically increasing and never reused
/// for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocates task IDs. The first ID handed out is 1.
#[derive(Debug, Default)]
pub struct TaskIdGen {
    next: u64,
}

impl TaskIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> TaskId {
        self.next += 1;
        TaskId(self.next)
    }
}

/// Stable slot index of a worker. Assigned at pool creation and kept when
/// the underlying thread is replaced after a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which transport a connection arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Tcp,
    Http,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Tcp => "tcp",
            TransportKind::Http => "http",
        }
    }
}

/// Unique identifier for an accepted connection: `{kind}_{ts_ms}_{suffix}`.
///
/// TCP connections keep one ID across many requests; HTTP connections get a
/// fresh ID per request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Generate a new connection ID for the given transport.
    pub fn generate(kind: TransportKind, now_ms: u64) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}_{}_{}", kind.as_str(), now_ms, &suffix[..9]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
