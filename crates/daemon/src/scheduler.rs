// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator timers: task deadlines and delayed worker respawns.
//!
//! Checked from the coordinator's 1-second tick; timers cannot assign
//! tasks by themselves, assignment stays event-driven.

use std::collections::HashMap;
use std::time::Instant;

use mcpool_core::{TaskId, WorkerId};

/// What a timer means when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// The task has been in flight longer than the configured deadline.
    TaskDeadline(TaskId),
    /// A crashed slot's backoff elapsed; respawn its worker.
    WorkerRestart(WorkerId),
}

/// Pending timers for the coordinator.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: HashMap<TimerKey, Instant>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) a timer.
    pub fn set(&mut self, key: TimerKey, fires_at: Instant) {
        self.timers.insert(key, fires_at);
    }

    /// Disarm a timer. Unknown keys are ignored.
    pub fn cancel(&mut self, key: &TimerKey) {
        self.timers.remove(key);
    }

    /// Remove and return every timer that has fired as of `now`.
    pub fn fired(&mut self, now: Instant) -> Vec<TimerKey> {
        let fired: Vec<TimerKey> = self
            .timers
            .iter()
            .filter(|(_, fires_at)| **fires_at <= now)
            .map(|(key, _)| *key)
            .collect();
        for key in &fired {
            self.timers.remove(key);
        }
        fired
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
