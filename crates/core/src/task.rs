// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task records: queued submissions and in-flight metadata.
//!
//! A task moves `queued -> assigned -> completed | failed`. Queued tasks
//! live in the [`crate::TaskQueue`]; assigned tasks live in the
//! coordinator's in-flight map as [`InFlightTask`] entries. There is no
//! cancellation of an assigned task.

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::id::{ConnectionId, TaskId, WorkerId};

/// One unit of tool-execution work submitted by a client.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    /// Name of the tool to invoke.
    pub tool: String,
    /// Tool-specific arguments, passed through opaquely.
    pub args: Value,
    /// Envelope `id` from the client request, echoed back in the response.
    pub request_id: Value,
    /// Connection the response must be delivered to.
    pub connection_id: ConnectionId,
    pub enqueued_at: Instant,
}

/// Metadata for a task that has been assigned to a worker.
///
/// Removed from the in-flight map exactly once, on completion or failure,
/// which is what makes the completion handlers idempotent.
#[derive(Debug, Clone)]
pub struct InFlightTask {
    pub worker: WorkerId,
    pub tool: String,
    pub request_id: Value,
    pub connection_id: ConnectionId,
    pub started_at: Instant,
}

impl InFlightTask {
    /// Start the in-flight record for `task` on `worker`.
    pub fn begin(task: &Task, worker: WorkerId, now: Instant) -> Self {
        Self {
            worker,
            tool: task.tool.clone(),
            request_id: task.request_id.clone(),
            connection_id: task.connection_id.clone(),
            started_at: now,
        }
    }

    /// How long the task has been running as of `now`.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
