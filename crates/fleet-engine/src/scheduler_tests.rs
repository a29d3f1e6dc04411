// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event_bus::EventBus;
use crate::registry::ProcessRegistry;
use fleet_core::SystemClock;
use std::collections::HashMap;
use std::time::Duration;

fn spec(script: &str) -> SpawnSpec {
    SpawnSpec {
        title: "t".into(),
        command: vec!["sh".into(), "-c".into(), script.into()],
        env: HashMap::new(),
        cwd: None,
    }
}

async fn scheduler_with_config(config: SchedulerConfig) -> Scheduler {
    let registry = Arc::new(ProcessRegistry::new());
    let bus = EventBus::new();
    let supervisor = Arc::new(Supervisor::new(registry, bus.clone(), Arc::new(SystemClock)));
    let scheduler = Scheduler::spawn(supervisor, bus, Arc::new(SystemClock), None);
    scheduler.set_config(config).await;
    scheduler
}

async fn poll_until<F: Fn(&SchedulerStatus) -> bool>(scheduler: &Scheduler, timeout: Duration, pred: F) -> SchedulerStatus {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let status = scheduler.status(true).await.unwrap();
        if pred(&status) {
            return status;
        }
        assert!(tokio::time::Instant::now() < deadline, "condition never became true; last status: {:?}", status);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn immediate_submit_runs_right_away_when_under_capacity() {
    let scheduler = scheduler_with_config(SchedulerConfig {
        max_concurrent: 2,
        ..Default::default()
    })
    .await;
    let result = scheduler
        .submit(spec("sleep 1"), SubmitOptions { priority: 5, immediate: true })
        .await
        .unwrap();
    assert_eq!(result.admission, Admission::Running);
}

#[tokio::test]
async fn submit_queues_once_at_capacity_and_dispatches_when_a_slot_frees() {
    let scheduler = scheduler_with_config(SchedulerConfig {
        max_concurrent: 1,
        ..Default::default()
    })
    .await;
    let first = scheduler.submit(spec("sleep 1"), SubmitOptions::default()).await.unwrap();
    assert_eq!(first.admission, Admission::Queued);
    poll_until(&scheduler, Duration::from_secs(2), |s| s.running == 1).await;

    let second = scheduler.submit(spec("exit 0"), SubmitOptions::default()).await.unwrap();
    assert_eq!(second.admission, Admission::Queued);

    // Once the first slot frees (sleep 1 exits), the queued entry should dispatch.
    poll_until(&scheduler, Duration::from_secs(3), |s| s.queued == 0).await;
}

#[tokio::test]
async fn higher_priority_entries_dispatch_before_lower_priority_ones() {
    let scheduler = scheduler_with_config(SchedulerConfig {
        max_concurrent: 1,
        ..Default::default()
    })
    .await;
    // Occupy the one slot first.
    scheduler
        .submit(spec("sleep 1"), SubmitOptions { priority: 5, immediate: true })
        .await
        .unwrap();

    let low = scheduler.submit(spec("exit 0"), SubmitOptions { priority: 1, immediate: false }).await.unwrap();
    let high = scheduler.submit(spec("exit 0"), SubmitOptions { priority: 9, immediate: false }).await.unwrap();

    poll_until(&scheduler, Duration::from_secs(2), |s| s.running == 1 && s.queued == 2).await;
    let status = scheduler.status(true).await.unwrap();
    let queued_ids: Vec<_> = status.entries.unwrap().iter().map(|e| e.process_id.clone()).collect();
    assert_eq!(queued_ids, vec![high.id.clone(), low.id.clone()]);
}

#[tokio::test]
async fn cancel_removes_a_queued_entry_before_it_dispatches() {
    let scheduler = scheduler_with_config(SchedulerConfig {
        max_concurrent: 1,
        ..Default::default()
    })
    .await;
    scheduler
        .submit(spec("sleep 1"), SubmitOptions { priority: 5, immediate: true })
        .await
        .unwrap();
    let queued = scheduler.submit(spec("exit 0"), SubmitOptions::default()).await.unwrap();

    let cancelled = scheduler.cancel(queued.id.clone()).await;
    assert!(cancelled);
    let status = scheduler.status(true).await.unwrap();
    assert_eq!(status.queued, 0);
}

#[tokio::test]
async fn cancel_on_an_unknown_id_is_a_no_op() {
    let scheduler = scheduler_with_config(SchedulerConfig::default()).await;
    let cancelled = scheduler.cancel(ProcessId::new("does-not-exist")).await;
    assert!(!cancelled);
}

#[tokio::test]
async fn pause_blocks_dispatch_until_resume() {
    let scheduler = scheduler_with_config(SchedulerConfig {
        max_concurrent: 2,
        ..Default::default()
    })
    .await;
    scheduler.pause().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let result = scheduler.submit(spec("exit 0"), SubmitOptions::default()).await.unwrap();
    assert_eq!(result.admission, Admission::Queued);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(scheduler.status(false).await.unwrap().queued, 1, "paused scheduler must not dispatch");

    scheduler.resume().await;
    poll_until(&scheduler, Duration::from_secs(2), |s| s.queued == 0).await;
}

#[tokio::test]
async fn a_failing_entry_is_retried_up_to_max_retries_with_backoff() {
    let scheduler = scheduler_with_config(SchedulerConfig {
        max_concurrent: 1,
        max_retries: 1,
        backoff_base_ms: 20,
        backoff_max_ms: 1000,
    })
    .await;
    scheduler
        .submit(spec("exit 1"), SubmitOptions { priority: 5, immediate: true })
        .await
        .unwrap();

    // First attempt fails, gets re-enqueued, then dispatches again (attempt 2),
    // fails again, and this time is not retried (attempt == max_retries).
    // We just assert the scheduler settles back to idle without panicking or
    // retrying forever.
    poll_until(&scheduler, Duration::from_secs(3), |s| s.running == 0 && s.queued == 0).await;
}
