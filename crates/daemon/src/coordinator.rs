// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Central dispatcher.
//!
//! The coordinator owns every piece of mutable server state: the pending
//! queue, the worker pool, the in-flight map, connection sinks, and the
//! counters behind `server/stats`. It runs as a single task consuming one
//! event channel, so handlers are plain synchronous methods and nothing
//! here needs a lock.
//!
//! Assignment is purely event-driven: workers are matched to queued tasks
//! when a submission arrives or a worker frees up, never from a poll. The
//! 1-second tick exists only to fire timers (task deadlines and restart
//! backoffs).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

use mcpool_core::{
    format_duration_ms, CallResult, Clock, ConnectionId, InFlightTask, Task, TaskId, TaskIdGen,
    TaskQueue, ToolRegistry, WorkerId,
};

use crate::config::Config;
use crate::event::{Event, ResponseSink};
use crate::pool::{PoolError, WorkerPool};
use crate::protocol::{Response, ServerStats};
use crate::scheduler::{Scheduler, TimerKey};

/// Single-task owner of all dispatcher state.
pub struct Coordinator {
    config: Config,
    clock: Arc<dyn Clock>,
    pool: WorkerPool,
    queue: TaskQueue,
    task_ids: TaskIdGen,
    /// Tasks currently executing, keyed by task ID. An entry is removed
    /// exactly once, which makes completion and failure idempotent.
    in_flight: HashMap<TaskId, InFlightTask>,
    connections: HashMap<ConnectionId, ResponseSink>,
    scheduler: Scheduler,
    /// Consecutive crash count per slot, cleared on a successful report.
    restart_streaks: HashMap<WorkerId, u32>,
    started_at: Instant,
    total_requests: u64,
    completed_tasks: u64,
    failed_tasks: u64,
}

impl Coordinator {
    pub fn new(
        config: Config,
        registry: Arc<ToolRegistry>,
        events: mpsc::Sender<Event>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PoolError> {
        let pool = WorkerPool::new(
            config.effective_workers(),
            events,
            registry,
            config.latency,
        )?;
        let queue = TaskQueue::new(config.queue_capacity);
        let started_at = clock.now();
        Ok(Self {
            config,
            clock,
            pool,
            queue,
            task_ids: TaskIdGen::new(),
            in_flight: HashMap::new(),
            connections: HashMap::new(),
            scheduler: Scheduler::new(),
            restart_streaks: HashMap::new(),
            started_at,
            total_requests: 0,
            completed_tasks: 0,
            failed_tasks: 0,
        })
    }

    /// Consume events until the channel closes or shutdown is signaled.
    pub async fn run(mut self, mut events: mpsc::Receiver<Event>, shutdown: Arc<Notify>) {
        // Created outside the loop: select! re-evaluates branches each
        // iteration, and a fresh sleep would reset on every event.
        let mut timer_check = tokio::time::interval(std::time::Duration::from_secs(1));
        timer_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            info!("event channel closed, coordinator stopping");
                            break;
                        }
                    }
                }
                _ = shutdown.notified() => {
                    info!("shutdown requested, coordinator stopping");
                    break;
                }
                _ = timer_check.tick() => {
                    let now = self.clock.now();
                    self.tick(now);
                }
            }
        }
        self.pool.terminate();
    }

    /// Dispatch one event to its handler.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::ConnectionOpened { id, sink } => {
                debug!(connection = %id, "connection opened");
                self.connections.insert(id, sink);
            }
            Event::ConnectionClosed { id } => {
                debug!(connection = %id, "connection closed");
                self.connections.remove(&id);
            }
            Event::ToolCall {
                request_id,
                name,
                args,
                connection_id,
            } => {
                self.submit(request_id, name, args, connection_id);
            }
            Event::WorkerDone {
                worker,
                task,
                result,
            } => {
                self.pool.release(worker);
                self.restart_streaks.remove(&worker);
                match result {
                    Ok(value) => self.complete_task(task, value),
                    Err(message) => self.fail_task(task, message),
                }
                self.try_assign();
            }
            Event::WorkerCrashed { worker, task } => {
                self.worker_crashed(worker, task);
            }
            Event::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    /// Admit a `tools/call` into the queue, or reject it if full.
    fn submit(&mut self, request_id: Value, name: String, args: Value, connection_id: ConnectionId) {
        self.total_requests += 1;
        let task = Task {
            id: self.task_ids.next(),
            tool: name,
            args,
            request_id: request_id.clone(),
            connection_id: connection_id.clone(),
            enqueued_at: self.clock.now(),
        };
        let id = task.id;
        let tool = task.tool.clone();

        if let Err(e) = self.queue.push(task) {
            warn!(task = %id, tool = %tool, "submission rejected: {e}");
            self.failed_tasks += 1;
            self.respond(&connection_id, Response::error(request_id, e.to_string()));
            return;
        }

        debug!(task = %id, tool = %tool, queued = self.queue.len(), "task queued");
        self.try_assign();
    }

    /// Match queued tasks with idle workers until one side runs out.
    pub(crate) fn try_assign(&mut self) {
        loop {
            let Some(worker) = self.pool.idle_worker() else {
                return;
            };
            let Some(task) = self.queue.pop() else {
                return;
            };

            match self.pool.dispatch(worker, &task) {
                Ok(()) => {
                    let now = self.clock.now();
                    debug!(task = %task.id, worker = %worker, tool = %task.tool, "task assigned");
                    if let Some(timeout) = self.config.task_timeout {
                        self.scheduler
                            .set(TimerKey::TaskDeadline(task.id), now + timeout);
                    }
                    self.in_flight
                        .insert(task.id, InFlightTask::begin(&task, worker, now));
                }
                Err(e) => {
                    warn!(worker = %worker, "dispatch failed, slot taken out of rotation: {e}");
                    self.pool.mark_dead(worker);
                    self.schedule_restart(worker);
                    self.queue.requeue(task);
                }
            }
        }
    }

    /// Deliver a successful result. No-op if the task already finished
    /// (e.g. it was failed by its deadline before the worker reported).
    fn complete_task(&mut self, task: TaskId, result: CallResult) {
        let Some(meta) = self.in_flight.remove(&task) else {
            debug!(task = %task, "late completion for finished task ignored");
            return;
        };
        self.scheduler.cancel(&TimerKey::TaskDeadline(task));
        self.completed_tasks += 1;

        let elapsed = meta.elapsed(self.clock.now());
        info!(
            task = %task,
            tool = %meta.tool,
            worker = %meta.worker,
            took = %format_duration_ms(elapsed.as_millis() as u64),
            "task completed"
        );

        let response = match serde_json::to_value(&result) {
            Ok(value) => Response::ok(meta.request_id, value),
            Err(e) => {
                error!(task = %task, "result serialization failed: {e}");
                Response::error(meta.request_id, format!("internal error: {e}"))
            }
        };
        self.respond(&meta.connection_id, response);
    }

    /// Deliver a failure. No-op if the task already finished.
    fn fail_task(&mut self, task: TaskId, message: String) {
        let Some(meta) = self.in_flight.remove(&task) else {
            debug!(task = %task, "late failure for finished task ignored");
            return;
        };
        self.scheduler.cancel(&TimerKey::TaskDeadline(task));
        self.failed_tasks += 1;

        warn!(task = %task, tool = %meta.tool, worker = %meta.worker, "task failed: {message}");
        self.respond(&meta.connection_id, Response::error(meta.request_id, message));
    }

    /// Route a response to its connection's sink.
    ///
    /// A missing sink means the client went away first; the response is
    /// dropped, which is the documented at-most-once delivery behavior.
    fn respond(&mut self, connection: &ConnectionId, response: Response) {
        match self.connections.get(connection) {
            Some(ResponseSink::Stream(sink)) => {
                if sink.send(response).is_err() {
                    warn!(connection = %connection, "stream sink closed, dropping connection");
                    self.connections.remove(connection);
                }
            }
            Some(ResponseSink::Once(_)) => {
                // One-shot sinks are consumed by their single response.
                if let Some(ResponseSink::Once(sink)) = self.connections.remove(connection) {
                    let _ = sink.send(response);
                }
            }
            None => {
                warn!(connection = %connection, "connection gone, response dropped");
            }
        }
    }

    /// Handle a worker thread death: fail its task, back off, restart.
    fn worker_crashed(&mut self, worker: WorkerId, task: Option<TaskId>) {
        self.pool.mark_dead(worker);

        // The worker names its task when it caught the panic itself; fall
        // back to the in-flight map when the thread died silently.
        let victim = task.or_else(|| {
            self.in_flight
                .iter()
                .find(|(_, meta)| meta.worker == worker)
                .map(|(id, _)| *id)
        });

        error!(worker = %worker, task = ?victim.map(|t| t.0), "worker crashed");
        if let Some(victim) = victim {
            self.fail_task(
                victim,
                format!("worker {worker} crashed while executing task"),
            );
        }
        self.schedule_restart(worker);
    }

    /// Restart a dead slot now, or arm a backoff timer for repeat crashes.
    fn schedule_restart(&mut self, worker: WorkerId) {
        let streak = self.restart_streaks.entry(worker).or_insert(0);
        *streak += 1;
        let delay = self.config.restart_delay(*streak);

        if delay.is_zero() {
            self.restart_worker(worker);
        } else {
            info!(worker = %worker, delay_ms = delay.as_millis() as u64, "worker restart delayed");
            self.scheduler
                .set(TimerKey::WorkerRestart(worker), self.clock.now() + delay);
        }
    }

    fn restart_worker(&mut self, worker: WorkerId) {
        match self.pool.restart(worker) {
            Ok(()) => self.try_assign(),
            Err(e) => {
                // Thread spawn failed; try again after the cap delay rather
                // than leaving the slot dead forever.
                error!(worker = %worker, "worker restart failed: {e}");
                self.scheduler.set(
                    TimerKey::WorkerRestart(worker),
                    self.clock.now() + self.config.restart_backoff_cap,
                );
            }
        }
    }

    /// Fire due timers.
    pub(crate) fn tick(&mut self, now: Instant) {
        for key in self.scheduler.fired(now) {
            match key {
                TimerKey::TaskDeadline(task) => {
                    // The worker thread stays busy until it reports; only
                    // the caller-visible outcome is decided here.
                    let timeout = self.config.task_timeout.unwrap_or_default();
                    self.fail_task(
                        task,
                        format!(
                            "task exceeded deadline of {}",
                            format_duration_ms(timeout.as_millis() as u64)
                        ),
                    );
                }
                TimerKey::WorkerRestart(worker) => {
                    self.restart_worker(worker);
                }
            }
        }
    }

    /// Snapshot for `server/stats`, `GET /stats`, and the periodic log line.
    pub(crate) fn stats(&self) -> ServerStats {
        let uptime = self.clock.now().saturating_duration_since(self.started_at);
        ServerStats {
            uptime_ms: uptime.as_millis() as u64,
            total_requests: self.total_requests,
            active_connections: self.connections.len(),
            completed_tasks: self.completed_tasks,
            failed_tasks: self.failed_tasks,
            queue_length: self.queue.len(),
            active_tasks: self.in_flight.len(),
            workers: self.pool.statuses(),
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
