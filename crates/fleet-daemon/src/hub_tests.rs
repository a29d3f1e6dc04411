// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_core::FakeClock;
use serde_json::json;
use std::sync::Arc;

fn hub() -> Hub {
    Hub::new(Arc::new(FakeClock::new(1_000)))
}

#[test]
fn add_then_get_connection_round_trips() {
    let hub = hub();
    let (id, _outbox) = hub.add_connection(json!({"agent": "a1"}));
    let record = hub.get_connection(&id).unwrap();
    assert_eq!(record.state, ConnectionState::Connected);
    assert_eq!(record.metadata, json!({"agent": "a1"}));
}

#[test]
fn remove_connection_is_idempotent() {
    let hub = hub();
    let (id, _outbox) = hub.add_connection(json!(null));
    hub.remove_connection(&id);
    assert!(hub.get_connection(&id).is_none());
    hub.remove_connection(&id);
}

#[test]
fn send_to_connection_delivers_in_order() {
    let hub = hub();
    let (id, mut outbox) = hub.add_connection(json!(null));
    assert!(hub.send_to_connection(&id, &json!("one")));
    assert!(hub.send_to_connection(&id, &json!("two")));
    assert_eq!(outbox.0.try_recv().unwrap(), json!("one"));
    assert_eq!(outbox.0.try_recv().unwrap(), json!("two"));
}

#[test]
fn send_to_connection_on_unknown_id_returns_false() {
    let hub = hub();
    assert!(!hub.send_to_connection(&SessionId::new("nope"), &json!("x")));
}

#[test]
fn broadcast_to_process_only_reaches_subscribed_sessions() {
    let hub = hub();
    let (subscribed, mut sub_outbox) = hub.add_connection(json!(null));
    let (unsubscribed, mut unsub_outbox) = hub.add_connection(json!(null));
    hub.update_subscription(&subscribed, SubscriptionAction::Subscribe, Some("proc1"));

    let delivered = hub.broadcast_to_process("proc1", &json!({"event": "log"}));
    assert_eq!(delivered, 1);
    assert!(sub_outbox.0.try_recv().is_ok());
    assert!(unsub_outbox.0.try_recv().is_err());
}

#[test]
fn subscribe_all_receives_every_process_scoped_broadcast() {
    let hub = hub();
    let (id, mut outbox) = hub.add_connection(json!(null));
    hub.update_subscription(&id, SubscriptionAction::SubscribeAll, None);
    hub.broadcast_to_process("anything", &json!("x"));
    assert!(outbox.0.try_recv().is_ok());
}

#[test]
fn get_connections_applies_the_filter() {
    let hub = hub();
    let (a, _) = hub.add_connection(json!(null));
    let (_b, _) = hub.add_connection(json!(null));
    let filter = ConnectionFilter {
        session_ids: Some(std::iter::once(a.as_str().to_string()).collect()),
        ..Default::default()
    };
    let matched = hub.get_connections(&filter);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, a);
}

#[test]
fn cleanup_inactive_removes_sessions_past_the_idle_threshold() {
    let clock = Arc::new(FakeClock::new(1_000));
    let hub = Hub::new(clock.clone());
    let (stale, _) = hub.add_connection(json!(null));
    clock.set(1_000 + 5_000);
    let (fresh, _) = hub.add_connection(json!(null));

    let removed = hub.cleanup_inactive(1_000);
    assert_eq!(removed, 1);
    assert!(hub.get_connection(&stale).is_none());
    assert!(hub.get_connection(&fresh).is_some());
}

#[test]
fn close_all_removes_every_session() {
    let hub = hub();
    hub.add_connection(json!(null));
    hub.add_connection(json!(null));
    hub.close_all();
    assert!(hub.get_connections(&ConnectionFilter::default()).is_empty());
}

#[test]
fn connection_events_are_emitted_for_connect_and_disconnect() {
    let hub = hub();
    let mut events = hub.subscribe_connection_events();
    let (id, _) = hub.add_connection(json!(null));
    hub.remove_connection(&id);

    match events.try_recv().unwrap() {
        ConnectionEvent::Connected { session_id, .. } => assert_eq!(session_id, id),
        other => panic!("unexpected event: {other:?}"),
    }
    match events.try_recv().unwrap() {
        ConnectionEvent::Disconnected { session_id, .. } => assert_eq!(session_id, id),
        other => panic!("unexpected event: {other:?}"),
    }
}
