// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seed scenario 2 (retry with backoff).

use fleet_core::{Event, ProcessStatus, SpawnSpec, SystemClock};
use fleet_engine::{EventBus, ProcessRegistry, Scheduler, SchedulerConfig, StopOptions, SubmitOptions, Supervisor};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

async fn wait_until<F: Fn() -> bool>(predicate: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn failing_command_retries_twice_with_growing_backoff_then_fails() {
    let clock = Arc::new(SystemClock);
    let bus = EventBus::new();
    let mut exits = bus.subscribe();
    let registry = Arc::new(ProcessRegistry::new());
    let supervisor = Arc::new(Supervisor::new(registry.clone(), bus.clone(), clock.clone()));
    let scheduler = Scheduler::spawn(supervisor, bus, clock, None);
    scheduler
        .set_config(SchedulerConfig {
            max_concurrent: 1,
            max_retries: 2,
            backoff_base_ms: 100,
            backoff_max_ms: 10_000,
        })
        .await;

    let spec = SpawnSpec {
        title: "always-fails".to_string(),
        command: vec!["sh".to_string(), "-c".to_string(), "exit 1".to_string()],
        env: HashMap::new(),
        cwd: None,
    };
    let id = scheduler.submit(spec, SubmitOptions { priority: 5, immediate: false }).await.unwrap().id;

    let mut exit_times_ms = Vec::new();
    while exit_times_ms.len() < 3 {
        match tokio::time::timeout(Duration::from_secs(5), exits.recv()).await {
            Ok(Some(Event::ProcessExited { record })) if record.id == id => {
                exit_times_ms.push(record.end_time_ms.expect("terminal record carries end_time"));
            }
            Ok(Some(_)) => continue,
            _ => break,
        }
    }
    assert_eq!(exit_times_ms.len(), 3, "attempt, retry 1, retry 2 each exit once");

    assert!(exit_times_ms[1] - exit_times_ms[0] >= 90, "first retry waits at least ~backoffBase");
    assert!(exit_times_ms[2] - exit_times_ms[1] >= 190, "second retry waits at least ~2x backoffBase");

    assert!(wait_until(|| registry.get(&id).map(|r| r.status) == Some(ProcessStatus::Failed), Duration::from_secs(2)).await);
    let final_record = registry.get(&id).expect("record still present");
    assert_eq!(final_record.status, ProcessStatus::Failed);
    assert_eq!(final_record.exit_code, Some(1));
}

/// A process killed by `stop` exits with `exit_code=None, signal=Some(_)`, the
/// same missing-exit-code shape as a genuine spawn failure. It must not be
/// mistaken for one and respawned.
#[tokio::test]
async fn a_stopped_process_is_not_retried() {
    let clock = Arc::new(SystemClock);
    let bus = EventBus::new();
    let registry = Arc::new(ProcessRegistry::new());
    let supervisor = Arc::new(Supervisor::new(registry.clone(), bus.clone(), clock.clone()));
    let scheduler = Scheduler::spawn(supervisor.clone(), bus, clock, None);
    scheduler
        .set_config(SchedulerConfig {
            max_concurrent: 1,
            max_retries: 3,
            backoff_base_ms: 50,
            backoff_max_ms: 1000,
        })
        .await;

    let spec = SpawnSpec {
        title: "long-runner".to_string(),
        command: vec!["sh".to_string(), "-c".to_string(), "sleep 30".to_string()],
        env: HashMap::new(),
        cwd: None,
    };
    let id = scheduler.submit(spec, SubmitOptions { priority: 5, immediate: true }).await.unwrap().id;
    assert!(wait_until(|| registry.get(&id).map(|r| r.status) == Some(ProcessStatus::Running), Duration::from_secs(2)).await);

    supervisor.stop(&id, StopOptions::default()).await.unwrap();
    assert!(
        wait_until(
            || matches!(registry.get(&id).map(|r| r.status), Some(ProcessStatus::Stopped | ProcessStatus::Failed)),
            Duration::from_secs(2)
        )
        .await
    );

    // Give the scheduler several backoff windows to have wrongly respawned it.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let record = registry.get(&id).expect("record still present");
    assert!(
        matches!(record.status, ProcessStatus::Stopped | ProcessStatus::Failed),
        "a stopped process must stay terminal, not {:?}",
        record.status
    );
}
