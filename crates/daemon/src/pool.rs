// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool manager.
//!
//! Owns a fixed set of worker slots. Slot IDs are assigned once; a crashed
//! slot keeps its ID and gets a fresh thread on restart. Only the
//! coordinator mutates the pool, so no locking is needed.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use mcpool_core::{Task, ToolRegistry, WorkerId, WorkerRecord, WorkerStateError};

use crate::config::LatencyWindow;
use crate::event::Event;
use crate::protocol::WorkerStatus;
use crate::worker::{self, WorkerTask};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker {0} does not exist")]
    UnknownWorker(WorkerId),

    #[error("worker {worker} is already busy with task {task}")]
    Busy { worker: WorkerId, task: u64 },

    #[error("worker {0} is dead")]
    Dead(WorkerId),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

struct Slot {
    record: WorkerRecord,
    /// Execution channel to the slot's thread; `None` while the slot waits
    /// for a restart.
    channel: Option<mpsc::Sender<WorkerTask>>,
}

/// Fixed-size pool of worker threads.
pub struct WorkerPool {
    slots: Vec<Slot>,
    events: mpsc::Sender<Event>,
    registry: Arc<ToolRegistry>,
    latency: LatencyWindow,
}

impl WorkerPool {
    /// Spawn `count` workers. The count is decided by the caller
    /// (`Config::effective_workers`).
    pub fn new(
        count: usize,
        events: mpsc::Sender<Event>,
        registry: Arc<ToolRegistry>,
        latency: LatencyWindow,
    ) -> Result<Self, PoolError> {
        let mut pool = Self {
            slots: Vec::with_capacity(count),
            events,
            registry,
            latency,
        };
        for index in 0..count {
            let id = WorkerId(index);
            let channel = pool.spawn_thread(id)?;
            pool.slots.push(Slot {
                record: WorkerRecord::new(id),
                channel: Some(channel),
            });
        }
        info!(workers = count, "worker pool initialized");
        Ok(pool)
    }

    fn spawn_thread(&self, id: WorkerId) -> Result<mpsc::Sender<WorkerTask>, PoolError> {
        // Capacity 1: a worker never holds more than its current task.
        let (task_tx, task_rx) = mpsc::channel(1);
        worker::spawn(
            id,
            task_rx,
            self.events.clone(),
            Arc::clone(&self.registry),
            self.latency,
        )?;
        Ok(task_tx)
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Lowest-ID idle live worker, if any.
    pub fn idle_worker(&self) -> Option<WorkerId> {
        self.slots
            .iter()
            .find(|slot| slot.channel.is_some() && !slot.record.busy())
            .map(|slot| slot.record.id())
    }

    fn slot_mut(&mut self, id: WorkerId) -> Result<&mut Slot, PoolError> {
        self.slots.get_mut(id.0).ok_or(PoolError::UnknownWorker(id))
    }

    /// Deliver `task` to an idle worker, marking it busy.
    ///
    /// The caller must have picked an idle worker; dispatching to a busy or
    /// dead slot is a dispatcher bug reported as an error.
    pub fn dispatch(&mut self, id: WorkerId, task: &Task) -> Result<(), PoolError> {
        let slot = self.slot_mut(id)?;
        let Some(channel) = slot.channel.as_ref() else {
            return Err(PoolError::Dead(id));
        };

        slot.record.assign(task.id).map_err(|e| match e {
            WorkerStateError::AlreadyBusy { worker, task } => PoolError::Busy {
                worker,
                task: task.0,
            },
        })?;

        let payload = WorkerTask {
            task: task.id,
            tool: task.tool.clone(),
            args: task.args.clone(),
        };
        if channel.try_send(payload).is_err() {
            // Channel gone or full: the thread died without reporting.
            slot.record.reset();
            slot.channel = None;
            return Err(PoolError::Dead(id));
        }
        Ok(())
    }

    /// Return a worker to idle after it reported a result or error.
    pub fn release(&mut self, id: WorkerId) {
        if let Ok(slot) = self.slot_mut(id) {
            slot.record.release();
        }
    }

    /// Take a crashed slot out of rotation until it is restarted.
    pub fn mark_dead(&mut self, id: WorkerId) {
        if let Ok(slot) = self.slot_mut(id) {
            slot.record.reset();
            slot.channel = None;
        }
    }

    /// Replace the slot's thread, keeping its ID. The slot comes back idle.
    pub fn restart(&mut self, id: WorkerId) -> Result<(), PoolError> {
        let channel = self.spawn_thread(id)?;
        let slot = self.slot_mut(id)?;
        // Dropping the old sender (if any) lets a still-running thread exit
        // once it finishes whatever it was doing.
        slot.channel = Some(channel);
        slot.record.reset();
        info!(worker = %id, "worker restarted");
        Ok(())
    }

    /// Drop all execution channels so worker threads exit.
    pub fn terminate(&mut self) {
        for slot in &mut self.slots {
            slot.channel = None;
        }
    }

    pub fn record(&self, id: WorkerId) -> Option<&WorkerRecord> {
        self.slots.get(id.0).map(|slot| &slot.record)
    }

    /// Stats view over every slot.
    pub fn statuses(&self) -> Vec<WorkerStatus> {
        self.slots
            .iter()
            .map(|slot| WorkerStatus {
                id: slot.record.id().0,
                busy: slot.record.busy(),
                tasks_completed: slot.record.tasks_completed(),
                current_task: slot.record.current_task().map(|t| t.0),
                alive: slot.channel.is_some(),
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
