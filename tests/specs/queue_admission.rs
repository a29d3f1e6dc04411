// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seed scenario 1 (admission ordering under `maxConcurrent=1`).

use fleet_core::{ProcessStatus, SpawnSpec, SystemClock};
use fleet_engine::{EventBus, ProcessRegistry, Scheduler, SchedulerConfig, SubmitOptions, Supervisor};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn spec(exit_code: i32) -> SpawnSpec {
    SpawnSpec {
        title: format!("exit-{exit_code}"),
        command: vec!["sh".to_string(), "-c".to_string(), format!("sleep 0.2; exit {exit_code}")],
        env: HashMap::new(),
        cwd: None,
    }
}

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
async fn single_slot_admits_by_priority_then_admission_order() {
    let clock = Arc::new(SystemClock);
    let bus = EventBus::new();
    let registry = Arc::new(ProcessRegistry::new());
    let supervisor = Arc::new(Supervisor::new(registry.clone(), bus.clone(), clock.clone()));
    let scheduler = Scheduler::spawn(supervisor, bus, clock, None);
    scheduler
        .set_config(SchedulerConfig {
            max_concurrent: 1,
            max_retries: 0,
            backoff_base_ms: 100,
            backoff_max_ms: 1000,
        })
        .await;

    let a = scheduler.submit(spec(0), SubmitOptions { priority: 5, immediate: false }).await.unwrap().id;
    let b = scheduler.submit(spec(0), SubmitOptions { priority: 8, immediate: false }).await.unwrap().id;
    let c = scheduler.submit(spec(0), SubmitOptions { priority: 5, immediate: false }).await.unwrap().id;

    assert!(wait_until(|| registry.get(&a).map(|r| r.status) == Some(ProcessStatus::Running), Duration::from_secs(2)).await);

    let status = scheduler.status(true).await.unwrap();
    assert_eq!(status.running, 1);
    assert_eq!(status.queued, 2);
    let entries = status.entries.expect("entries requested");
    assert_eq!(entries[0].process_id, b, "higher priority B dispatches ahead of C");
    assert_eq!(entries[1].process_id, c);

    assert!(wait_until(|| registry.get(&a).map(|r| r.status) == Some(ProcessStatus::Stopped), Duration::from_secs(2)).await);
    assert!(wait_until(|| registry.get(&b).map(|r| r.status) == Some(ProcessStatus::Running), Duration::from_secs(2)).await);
    let c_status = registry.get(&c).map(|r| r.status);
    assert!(c_status != Some(ProcessStatus::Running), "C must still be waiting while B runs");

    assert!(wait_until(|| registry.get(&b).map(|r| r.status) == Some(ProcessStatus::Stopped), Duration::from_secs(2)).await);
    assert!(wait_until(|| registry.get(&c).map(|r| r.status) == Some(ProcessStatus::Running), Duration::from_secs(2)).await);
}
