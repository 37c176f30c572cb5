// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker thread runtime.
//!
//! Each worker is a dedicated OS thread that blocks on its task channel,
//! runs the tool, and reports back over the coordinator's event channel.
//! Tool execution is wrapped in `catch_unwind`: a tool error is an ordinary
//! task failure, a panic tears the thread down and is reported as a crash
//! so the coordinator can restart the slot.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use mcpool_core::{TaskId, ToolRegistry, WorkerId};

use crate::config::LatencyWindow;
use crate::event::Event;

/// Payload delivered to a worker's execution channel.
#[derive(Debug)]
pub(crate) struct WorkerTask {
    pub task: TaskId,
    pub tool: String,
    pub args: Value,
}

/// Spawn the thread for one worker slot.
pub(crate) fn spawn(
    id: WorkerId,
    mut tasks: mpsc::Receiver<WorkerTask>,
    events: mpsc::Sender<Event>,
    registry: Arc<ToolRegistry>,
    latency: LatencyWindow,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("mcpool-worker-{id}"))
        .spawn(move || {
            debug!(worker = %id, "worker thread started");

            while let Some(job) = tasks.blocking_recv() {
                // Stand-in for the I/O latency real tools would have.
                let delay = latency.sample();
                if !delay.is_zero() {
                    thread::sleep(delay);
                }

                let outcome =
                    catch_unwind(AssertUnwindSafe(|| registry.execute(&job.tool, &job.args)));

                let event = match outcome {
                    Ok(Ok(result)) => Event::WorkerDone {
                        worker: id,
                        task: job.task,
                        result: Ok(result),
                    },
                    Ok(Err(e)) => Event::WorkerDone {
                        worker: id,
                        task: job.task,
                        result: Err(e.to_string()),
                    },
                    Err(_) => {
                        // The thread's registry state can no longer be
                        // trusted; report the crash and exit the loop so the
                        // coordinator replaces the slot.
                        let _ = events.blocking_send(Event::WorkerCrashed {
                            worker: id,
                            task: Some(job.task),
                        });
                        break;
                    }
                };

                if events.blocking_send(event).is_err() {
                    // Coordinator gone; nothing left to report to.
                    break;
                }
            }

            debug!(worker = %id, "worker thread exiting");
        })
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
