// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bookkeeping record for one worker slot.

use thiserror::Error;

use crate::id::{TaskId, WorkerId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkerStateError {
    #[error("worker {worker} is already busy with task {task}")]
    AlreadyBusy { worker: WorkerId, task: TaskId },
}

/// State of one worker slot, owned by the pool manager.
///
/// A worker is busy exactly when it has a current task — the invariant is
/// held by construction: there is no separate `busy` flag to drift.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    id: WorkerId,
    current_task: Option<TaskId>,
    tasks_completed: u64,
}

impl WorkerRecord {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            current_task: None,
            tasks_completed: 0,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn busy(&self) -> bool {
        self.current_task.is_some()
    }

    pub fn current_task(&self) -> Option<TaskId> {
        self.current_task
    }

    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed
    }

    /// Mark the worker busy with `task`. Assigning to a busy worker is a
    /// dispatcher bug, reported as an error rather than a recoverable state.
    pub fn assign(&mut self, task: TaskId) -> Result<(), WorkerStateError> {
        if let Some(current) = self.current_task {
            return Err(WorkerStateError::AlreadyBusy {
                worker: self.id,
                task: current,
            });
        }
        self.current_task = Some(task);
        Ok(())
    }

    /// Return the worker to idle after it reported a result or error,
    /// counting the finished task.
    pub fn release(&mut self) {
        if self.current_task.take().is_some() {
            self.tasks_completed += 1;
        }
    }

    /// Reset the slot to idle without counting anything, used when the
    /// underlying thread is replaced after a crash.
    pub fn reset(&mut self) {
        self.current_task = None;
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
