// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seed scenario 6 (hub fan-out across differently-subscribed sessions).

use fleet_core::{Event, FakeClock, LogEntry, LogStream};
use fleet_daemon::hub::SubscriptionAction;
use fleet_daemon::Hub;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

async fn next_message(outbox: &mut fleet_daemon::hub::Outbox) -> Option<Value> {
    tokio::time::timeout(Duration::from_millis(200), outbox.0.recv()).await.unwrap_or(None)
}

#[tokio::test]
async fn process_log_reaches_subscribed_and_subscribe_all_sessions_only() {
    let clock = Arc::new(FakeClock::new(1_700_000_000_000));
    let hub = Hub::new(clock);

    let (s1, mut outbox1) = hub.add_connection(json!({}));
    let (s2, mut outbox2) = hub.add_connection(json!({}));
    let (_s3, mut outbox3) = hub.add_connection(json!({}));

    hub.update_subscription(&s1, SubscriptionAction::Subscribe, Some("proc-x"));
    hub.update_subscription(&s2, SubscriptionAction::SubscribeAll, None);

    let event = Event::ProcessLog {
        process_id: "proc-x".to_string(),
        entry: LogEntry { id: 1, timestamp_ms: 1_700_000_000_123, stream: LogStream::Stdout, text: "hello".to_string() },
    };
    let payload = serde_json::to_value(&event).unwrap();
    hub.route_event(&event, &payload);

    assert!(next_message(&mut outbox1).await.is_some(), "s1 subscribed to proc-x");
    assert!(next_message(&mut outbox2).await.is_some(), "s2 subscribed to everything");
    assert!(next_message(&mut outbox3).await.is_none(), "s3 has no subscriptions");

    let filter = fleet_core::ConnectionFilter {
        subscribed_to_all: Some(true),
        ..Default::default()
    };
    let reached = hub.broadcast(&json!({"type": "ping"}), Some(&filter));
    assert_eq!(reached, 1, "only s2 is subscribed to everything");
    assert!(next_message(&mut outbox2).await.is_some());
    assert!(next_message(&mut outbox1).await.is_none());
    assert!(next_message(&mut outbox3).await.is_none());
}
