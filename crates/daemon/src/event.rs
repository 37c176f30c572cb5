// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator inbox.
//!
//! Everything that mutates dispatcher state arrives here: submissions from
//! the transports, reports from worker threads, connection lifecycle, and
//! stats queries. The coordinator processes events sequentially, so none of
//! the state it owns needs locking.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use mcpool_core::{CallResult, ConnectionId, TaskId, WorkerId};

use crate::protocol::{Response, ServerStats};

/// Where a response for a connection goes.
#[derive(Debug)]
pub enum ResponseSink {
    /// Persistent connection taking any number of responses (TCP).
    Stream(mpsc::UnboundedSender<Response>),
    /// One-shot connection consumed by its single response (HTTP).
    Once(oneshot::Sender<Response>),
}

/// Events processed by the coordinator.
#[derive(Debug)]
pub enum Event {
    /// A transport accepted a connection and registered its sink.
    ConnectionOpened {
        id: ConnectionId,
        sink: ResponseSink,
    },

    /// The connection went away; pending responses for it are dropped.
    ConnectionClosed { id: ConnectionId },

    /// A well-formed `tools/call` to enqueue.
    ToolCall {
        request_id: Value,
        name: String,
        args: Value,
        connection_id: ConnectionId,
    },

    /// A worker finished a task, successfully or not.
    WorkerDone {
        worker: WorkerId,
        task: TaskId,
        result: Result<CallResult, String>,
    },

    /// A worker thread died; its in-flight task (if any) must be failed and
    /// the slot restarted.
    WorkerCrashed {
        worker: WorkerId,
        task: Option<TaskId>,
    },

    /// Queue-bypassing stats query.
    Stats {
        reply: oneshot::Sender<ServerStats>,
    },
}
