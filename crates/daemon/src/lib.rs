// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mcpool-daemon: worker-pool task dispatcher served over TCP and HTTP.
//!
//! Architecture:
//! - Coordinator task: owns the queue, the worker pool bookkeeping, and all
//!   connection state; processes events sequentially from one channel.
//! - Worker threads: run tool logic off the runtime, reporting back through
//!   the same event channel.
//! - Transport tasks: a TCP listener (line-delimited JSON envelopes) and an
//!   axum HTTP server, both of which only ever talk to the coordinator.

pub mod config;
pub mod coordinator;
pub mod event;
pub mod http;
pub mod listener;
pub mod pool;
pub mod protocol;
pub mod scheduler;
pub mod server;
mod worker;

pub use config::{Config, ConfigError, LatencyWindow};
pub use coordinator::Coordinator;
pub use event::{Event, ResponseSink};
pub use protocol::{Health, Request, Response, ServerStats, WorkerStatus};
pub use server::{ServerError, ServerHandle};
