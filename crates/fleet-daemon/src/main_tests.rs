// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_core::FakeClock;
use serde_json::json;

fn hub() -> Hub {
    Hub::new(Arc::new(FakeClock::new(1_700_000_000_000)))
}

#[test]
fn subscribe_action_updates_the_session_subscriptions() {
    let hub = hub();
    let (session_id, _outbox) = hub.add_connection(json!({}));
    handle_client_message(&hub, &session_id, &json!({"action": "subscribe", "processId": "p1"}));

    let record = hub.get_connection(&session_id).unwrap();
    assert!(record.subscriptions.matches("p1"));
}

#[test]
fn unsubscribe_all_clears_subscriptions() {
    let hub = hub();
    let (session_id, _outbox) = hub.add_connection(json!({}));
    handle_client_message(&hub, &session_id, &json!({"action": "subscribeAll"}));
    handle_client_message(&hub, &session_id, &json!({"action": "unsubscribeAll"}));

    let record = hub.get_connection(&session_id).unwrap();
    assert!(!record.subscriptions.matches("anything"));
}

#[test]
fn missing_action_field_is_ignored_without_panicking() {
    let hub = hub();
    let (session_id, _outbox) = hub.add_connection(json!({}));
    handle_client_message(&hub, &session_id, &json!({"processId": "p1"}));
}

#[test]
fn unknown_action_is_ignored_without_panicking() {
    let hub = hub();
    let (session_id, _outbox) = hub.add_connection(json!({}));
    handle_client_message(&hub, &session_id, &json!({"action": "do-a-barrel-roll"}));
}
