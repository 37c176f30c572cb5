// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded FIFO queue of pending tasks.
//!
//! Insertion order is execution priority: no reordering, no priority
//! levels. The bound is the admission-control point — a full queue rejects
//! the submit synchronously instead of growing without limit.

use std::collections::VecDeque;

use thiserror::Error;

use crate::task::Task;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue full: {capacity} tasks pending")]
    Full { capacity: usize },
}

/// FIFO of tasks waiting for a worker.
#[derive(Debug)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
    capacity: usize,
}

impl TaskQueue {
    /// Create a queue holding at most `capacity` pending tasks.
    pub fn new(capacity: usize) -> Self {
        Self {
            tasks: VecDeque::new(),
            capacity,
        }
    }

    /// Append a task at the tail. Fails when the queue is at capacity.
    pub fn push(&mut self, task: Task) -> Result<(), QueueError> {
        if self.tasks.len() >= self.capacity {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }
        self.tasks.push_back(task);
        Ok(())
    }

    /// Remove and return the head of the queue.
    pub fn pop(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    /// Put a popped task back at the head, preserving FIFO order.
    ///
    /// Used when a dispatch attempt fails after the pop; bypasses the
    /// capacity check since the task was already admitted.
    pub fn requeue(&mut self, task: Task) {
        self.tasks.push_front(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
