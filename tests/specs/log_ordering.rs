// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seed scenario 3 (log ordering through the hub to a subscribed session).

use fleet_core::{SpawnSpec, SystemClock};
use fleet_daemon::hub::SubscriptionAction;
use fleet_daemon::Hub;
use fleet_engine::{EventBus, ProcessRegistry, Supervisor};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn stdout_lines_arrive_in_order_with_monotonic_timestamps() {
    let clock = Arc::new(SystemClock);
    let bus = EventBus::new();
    let registry = Arc::new(ProcessRegistry::new());
    let supervisor = Arc::new(Supervisor::new(registry, bus.clone(), clock.clone()));
    let hub = Arc::new(Hub::new(clock));

    let (session_id, mut outbox) = hub.add_connection(serde_json::json!({}));

    let spec = SpawnSpec {
        title: "three-lines".to_string(),
        command: vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo out-1; sleep 0.05; echo out-2; sleep 0.05; echo out-3".to_string(),
        ],
        env: HashMap::new(),
        cwd: None,
    };
    let id = fleet_core::ProcessId::new(uuid::Uuid::new_v4().to_string());
    let record = supervisor.start(id.clone(), spec, 5).expect("spawn succeeds");
    hub.update_subscription(&session_id, SubscriptionAction::Subscribe, Some(record.id.as_str()));

    let mut forward_events = bus.subscribe();
    let forward_hub = hub.clone();
    tokio::spawn(async move {
        while let Some(event) = forward_events.recv().await {
            let payload = serde_json::to_value(&event).expect("events are always serializable");
            forward_hub.route_event(&event, &payload);
        }
    });

    let mut lines = Vec::new();
    let mut timestamps = Vec::new();
    while lines.len() < 3 {
        let msg = tokio::time::timeout(Duration::from_secs(3), outbox.0.recv())
            .await
            .expect("a process.log message arrives within the timeout")
            .expect("outbox is not closed");
        let Value::Object(map) = &msg else { panic!("event payload is a JSON object") };
        if map.get("type").and_then(Value::as_str) != Some("process.log") {
            continue;
        }
        let entry = &map["entry"];
        lines.push(entry["text"].as_str().unwrap_or_default().to_string());
        timestamps.push(entry["timestamp_ms"].as_u64().expect("log entry carries a timestamp"));
    }

    assert_eq!(lines, vec!["out-1", "out-2", "out-3"]);
    assert!(timestamps[0] < timestamps[1]);
    assert!(timestamps[1] < timestamps[2]);
}
