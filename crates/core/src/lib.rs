// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mcpool-core: domain types for the mcpool task dispatcher.
//!
//! Pure data and logic only — no sockets, no threads. The daemon crate
//! owns all I/O and wires these types together.

pub mod clock;
pub mod id;
pub mod queue;
pub mod task;
pub mod time_fmt;
pub mod tool;
pub mod worker;

pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{ConnectionId, TaskId, TaskIdGen, TransportKind, WorkerId};
pub use queue::{QueueError, TaskQueue};
pub use task::{InFlightTask, Task};
pub use time_fmt::format_duration_ms;
pub use tool::{CallResult, ContentItem, ToolError, ToolInfo, ToolRegistry};
pub use worker::{WorkerRecord, WorkerStateError};
