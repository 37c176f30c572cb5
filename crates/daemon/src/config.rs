// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration, loaded from `MCPOOL_*` environment variables.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;

/// Upper bound on pool size regardless of hardware parallelism.
pub const DEFAULT_WORKER_CAP: usize = 8;

/// Default bound on pending tasks before submits are rejected.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default in-flight deadline after which a task is failed.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Simulated tool latency, sampled uniformly per execution.
///
/// Stands in for the I/O the demo tools would really perform. `none()` is
/// used in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyWindow {
    pub min: Duration,
    pub max: Duration,
}

impl LatencyWindow {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn is_none(&self) -> bool {
        self.max.is_zero()
    }

    /// Draw one delay from the window.
    pub fn sample(&self) -> Duration {
        if self.is_none() {
            return Duration::ZERO;
        }
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(500),
            max: Duration::from_millis(1500),
        }
    }
}

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP transport bind address.
    pub tcp_addr: SocketAddr,
    /// HTTP transport bind address.
    pub http_addr: SocketAddr,
    /// Hard cap on pool size.
    pub worker_cap: usize,
    /// Explicit pool size, overriding the parallelism-based default.
    pub worker_count: Option<usize>,
    /// Pending-task bound; a full queue rejects submits.
    pub queue_capacity: usize,
    /// In-flight deadline. `None` disables the timeout.
    pub task_timeout: Option<Duration>,
    /// Simulated tool latency window.
    pub latency: LatencyWindow,
    /// Base delay for consecutive worker restarts.
    pub restart_backoff_base: Duration,
    /// Ceiling for the restart backoff.
    pub restart_backoff_cap: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tcp_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            http_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            worker_cap: DEFAULT_WORKER_CAP,
            worker_count: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            task_timeout: Some(DEFAULT_TASK_TIMEOUT),
            latency: LatencyWindow::default(),
            restart_backoff_base: Duration::from_millis(500),
            restart_backoff_cap: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = env_parse::<SocketAddr>("MCPOOL_TCP_ADDR")? {
            config.tcp_addr = addr;
        }
        if let Some(addr) = env_parse::<SocketAddr>("MCPOOL_HTTP_ADDR")? {
            config.http_addr = addr;
        }
        if let Some(count) = env_parse::<usize>("MCPOOL_WORKERS")? {
            config.worker_count = Some(count.max(1));
        }
        if let Some(cap) = env_parse::<usize>("MCPOOL_MAX_WORKERS")? {
            config.worker_cap = cap.max(1);
        }
        if let Some(capacity) = env_parse::<usize>("MCPOOL_QUEUE_CAPACITY")? {
            config.queue_capacity = capacity.max(1);
        }
        if let Some(ms) = env_parse::<u64>("MCPOOL_TASK_TIMEOUT_MS")? {
            config.task_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(window) = env_var("MCPOOL_TOOL_LATENCY_MS") {
            config.latency = parse_latency(&window)?;
        }

        Ok(config)
    }

    /// Pool size: explicit override, else `min(available_parallelism, cap)`.
    pub fn effective_workers(&self) -> usize {
        let count = self.worker_count.unwrap_or_else(|| {
            let parallelism = std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1);
            parallelism.min(self.worker_cap)
        });
        count.max(1)
    }

    /// Restart delay for the `streak`-th consecutive crash of a slot.
    ///
    /// The first crash restarts immediately; each further crash doubles the
    /// delay from the base, capped.
    pub fn restart_delay(&self, streak: u32) -> Duration {
        if streak <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u32 << (streak - 2).min(16);
        let delay = self.restart_backoff_base.saturating_mul(factor);
        delay.min(self.restart_backoff_cap)
    }
}

fn env_var(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env_var(name) {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Parse `"500-1500"` (range) or `"0"` / `"250"` (fixed) milliseconds.
fn parse_latency(value: &str) -> Result<LatencyWindow, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "MCPOOL_TOOL_LATENCY_MS",
        value: value.to_string(),
    };

    match value.split_once('-') {
        Some((min, max)) => {
            let min: u64 = min.trim().parse().map_err(|_| invalid())?;
            let max: u64 = max.trim().parse().map_err(|_| invalid())?;
            if max < min {
                return Err(invalid());
            }
            Ok(LatencyWindow::new(
                Duration::from_millis(min),
                Duration::from_millis(max),
            ))
        }
        None => {
            let ms: u64 = value.trim().parse().map_err(|_| invalid())?;
            let fixed = Duration::from_millis(ms);
            Ok(LatencyWindow::new(fixed, fixed))
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
