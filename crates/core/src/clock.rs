// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so time-dependent logic is testable.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of time for the coordinator and scheduler.
pub trait Clock: Send + Sync {
    /// Monotonic instant, used for durations and deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch, used in connection IDs.
    fn now_ms(&self) -> u64;
}

/// Real system clock.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually-advanced clock for tests.
#[derive(Debug, Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

#[derive(Debug)]
struct FakeClockState {
    now: Instant,
    now_ms: u64,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                now: Instant::now(),
                now_ms: 0,
            })),
        }
    }

    /// Move time forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut state = self.inner.lock();
        state.now += delta;
        state.now_ms += delta.as_millis() as u64;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().now
    }

    fn now_ms(&self) -> u64 {
        self.inner.lock().now_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
