// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mcpool_core::{ConnectionId, TaskId};
use serde_json::json;
use std::time::Instant;

fn task(id: u64, tool: &str) -> Task {
    Task {
        id: TaskId(id),
        tool: tool.to_string(),
        args: json!({"text": "hi"}),
        request_id: json!(id),
        connection_id: ConnectionId::from("tcp_0_test"),
        enqueued_at: Instant::now(),
    }
}

fn test_pool(count: usize) -> (WorkerPool, tokio::sync::mpsc::Receiver<Event>) {
    let (event_tx, event_rx) = tokio::sync::mpsc::channel(64);
    let pool = WorkerPool::new(
        count,
        event_tx,
        Arc::new(ToolRegistry::builtin()),
        LatencyWindow::none(),
    )
    .unwrap();
    (pool, event_rx)
}

#[test]
fn pool_starts_all_idle() {
    let (pool, _events) = test_pool(3);
    assert_eq!(pool.size(), 3);
    for status in pool.statuses() {
        assert!(!status.busy);
        assert!(status.alive);
        assert_eq!(status.tasks_completed, 0);
    }
    assert_eq!(pool.idle_worker(), Some(WorkerId(0)));
}

#[test]
fn dispatch_marks_busy_and_executes() {
    let (mut pool, mut events) = test_pool(1);

    pool.dispatch(WorkerId(0), &task(1, "echo")).unwrap();
    assert!(pool.record(WorkerId(0)).unwrap().busy());
    assert_eq!(pool.idle_worker(), None);

    match events.blocking_recv().unwrap() {
        Event::WorkerDone { worker, task, .. } => {
            assert_eq!(worker, WorkerId(0));
            assert_eq!(task, TaskId(1));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    pool.release(WorkerId(0));
    assert!(!pool.record(WorkerId(0)).unwrap().busy());
    assert_eq!(pool.record(WorkerId(0)).unwrap().tasks_completed(), 1);
}

#[test]
fn dispatch_to_busy_worker_is_an_error() {
    let (mut pool, _events) = test_pool(1);
    pool.dispatch(WorkerId(0), &task(1, "echo")).unwrap();

    let err = pool.dispatch(WorkerId(0), &task(2, "echo")).unwrap_err();
    assert!(matches!(err, PoolError::Busy { worker: WorkerId(0), task: 1 }));
}

#[test]
fn dispatch_to_unknown_worker_is_an_error() {
    let (mut pool, _events) = test_pool(1);
    let err = pool.dispatch(WorkerId(9), &task(1, "echo")).unwrap_err();
    assert!(matches!(err, PoolError::UnknownWorker(WorkerId(9))));
}

#[test]
fn dead_slot_is_skipped_until_restart() {
    let (mut pool, _events) = test_pool(2);

    pool.mark_dead(WorkerId(0));
    assert_eq!(pool.idle_worker(), Some(WorkerId(1)));
    assert!(matches!(
        pool.dispatch(WorkerId(0), &task(1, "echo")),
        Err(PoolError::Dead(WorkerId(0)))
    ));

    pool.restart(WorkerId(0)).unwrap();
    assert_eq!(pool.idle_worker(), Some(WorkerId(0)));
    let status = &pool.statuses()[0];
    assert!(status.alive && !status.busy);
}

#[test]
fn restart_keeps_slot_id_and_clears_task() {
    let (mut pool, _events) = test_pool(1);
    pool.dispatch(WorkerId(0), &task(1, "echo")).unwrap();

    pool.restart(WorkerId(0)).unwrap();
    let record = pool.record(WorkerId(0)).unwrap();
    assert_eq!(record.id(), WorkerId(0));
    assert!(!record.busy());
}

#[test]
fn terminate_drops_all_channels() {
    let (mut pool, mut events) = test_pool(2);
    pool.terminate();

    for status in pool.statuses() {
        assert!(!status.alive);
    }
    assert_eq!(pool.idle_worker(), None);

    // Workers exit once their channels drop; with the pool (and its event
    // sender) gone too, the event channel closes.
    drop(pool);
    assert!(events.blocking_recv().is_none());
}
