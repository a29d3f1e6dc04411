// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection Hub (spec §4.4): the WebSocket session table and fan-out.
//! Transport-agnostic — the axum WebSocket handler owns the socket split and
//! pumps the per-session outbox this hub hands back from `add_connection`
//! into the socket; the hub itself only tracks session state and routes
//! messages.

use fleet_core::{Clock, ConnectionFilter, ConnectionState, Event, SessionId, SessionRecord};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Outbound channel capacity per session before `sendToConnection` starts
/// dropping the session as overflowed (spec §4.4 "overflow... removed").
const OUTBOX_CAPACITY: usize = 256;

const CONNECTION_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Connected { session_id: SessionId, timestamp_ms: u64 },
    Disconnected { session_id: SessionId, timestamp_ms: u64 },
    Subscribed { session_id: SessionId, timestamp_ms: u64, process_id: Option<String> },
    Unsubscribed { session_id: SessionId, timestamp_ms: u64, process_id: Option<String> },
    Error { session_id: SessionId, timestamp_ms: u64, details: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
    SubscribeAll,
    UnsubscribeAll,
}

struct Session {
    record: SessionRecord,
    outbox: mpsc::Sender<serde_json::Value>,
}

/// `sendToConnection`/broadcast handle returned to the axum layer: the
/// receiving half of a session's outbox. Dropping it (without closing the
/// hub-side entry) just stalls delivery; the caller's socket-pump task
/// should hold this for the session's lifetime.
pub struct Outbox(pub mpsc::Receiver<serde_json::Value>);

pub struct Hub {
    sessions: RwLock<HashMap<String, Session>>,
    clock: Arc<dyn Clock>,
    connection_events: broadcast::Sender<ConnectionEvent>,
}

impl Hub {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (connection_events, _) = broadcast::channel(CONNECTION_EVENT_CAPACITY);
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            connection_events,
        }
    }

    pub fn add_connection(&self, metadata: serde_json::Value) -> (SessionId, Outbox) {
        let id = SessionId::new(uuid::Uuid::new_v4().to_string());
        let now = self.clock.epoch_ms();
        let record = SessionRecord::new(id.clone(), now, metadata);
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        self.sessions.write().insert(
            id.as_str().to_string(),
            Session { record, outbox: tx },
        );
        self.emit(ConnectionEvent::Connected { session_id: id.clone(), timestamp_ms: now });
        (id, Outbox(rx))
    }

    /// Idempotent (spec §4.4): removing an id not present is a no-op.
    pub fn remove_connection(&self, id: &SessionId) {
        if self.sessions.write().remove(id.as_str()).is_some() {
            self.emit(ConnectionEvent::Disconnected {
                session_id: id.clone(),
                timestamp_ms: self.clock.epoch_ms(),
            });
        }
    }

    pub fn get_connection(&self, id: &SessionId) -> Option<SessionRecord> {
        self.sessions.read().get(id.as_str()).map(|s| s.record.clone())
    }

    pub fn get_connections(&self, filter: &ConnectionFilter) -> Vec<SessionRecord> {
        let now = self.clock.epoch_ms();
        self.sessions
            .read()
            .values()
            .map(|s| &s.record)
            .filter(|r| filter.matches(r, now))
            .cloned()
            .collect()
    }

    /// Enqueues `msg` onto the session's outbox. A full or closed outbox
    /// marks the session `error` and removes it (spec §4.4 concurrency
    /// model); returns `false` in that case.
    pub fn send_to_connection(&self, id: &SessionId, msg: &serde_json::Value) -> bool {
        let sender = {
            let sessions = self.sessions.read();
            sessions.get(id.as_str()).map(|s| s.outbox.clone())
        };
        let Some(sender) = sender else { return false };
        match sender.try_send(msg.clone()) {
            Ok(()) => true,
            Err(_) => {
                self.mark_error(id, "outbox overflowed or closed");
                false
            }
        }
    }

    fn mark_error(&self, id: &SessionId, details: &str) {
        {
            let mut sessions = self.sessions.write();
            if let Some(session) = sessions.get_mut(id.as_str()) {
                session.record.state = ConnectionState::Error;
            }
        }
        self.emit(ConnectionEvent::Error {
            session_id: id.clone(),
            timestamp_ms: self.clock.epoch_ms(),
            details: details.to_string(),
        });
        self.remove_connection(id);
    }

    /// Delivers `msg` to every session matching `filter` (all sessions if
    /// `None`). Returns the count of sessions the message was accepted by.
    pub fn broadcast(&self, msg: &serde_json::Value, filter: Option<&ConnectionFilter>) -> usize {
        let ids: Vec<SessionId> = {
            let now = self.clock.epoch_ms();
            let sessions = self.sessions.read();
            sessions
                .values()
                .filter(|s| filter.map(|f| f.matches(&s.record, now)).unwrap_or(true))
                .map(|s| s.record.id.clone())
                .collect()
        };
        ids.iter().filter(|id| self.send_to_connection(id, msg)).count()
    }

    /// Delivers `msg` only to sessions subscribed to `process_id` (spec
    /// §4.4 subscription routing).
    pub fn broadcast_to_process(&self, process_id: &str, msg: &serde_json::Value) -> usize {
        let ids: Vec<SessionId> = {
            let sessions = self.sessions.read();
            sessions
                .values()
                .filter(|s| s.record.subscriptions.matches(process_id))
                .map(|s| s.record.id.clone())
                .collect()
        };
        ids.iter().filter(|id| self.send_to_connection(id, msg)).count()
    }

    /// Publishes a domain event to subscribed sessions, or to everyone when
    /// the event has no process scope (spec §4.4 "not tied to a process").
    pub fn route_event(&self, event: &Event, payload: &serde_json::Value) {
        match event.process_id() {
            Some(process_id) => {
                self.broadcast_to_process(process_id, payload);
            }
            None => {
                self.broadcast(payload, None);
            }
        }
    }

    pub fn update_subscription(&self, id: &SessionId, action: SubscriptionAction, process_id: Option<&str>) {
        let mut sessions = self.sessions.write();
        let Some(session) = sessions.get_mut(id.as_str()) else { return };
        match action {
            SubscriptionAction::Subscribe => {
                if let Some(pid) = process_id {
                    session.record.subscriptions.subscribe(pid);
                }
            }
            SubscriptionAction::Unsubscribe => {
                if let Some(pid) = process_id {
                    session.record.subscriptions.unsubscribe(pid);
                }
            }
            SubscriptionAction::SubscribeAll => session.record.subscriptions.subscribe_all(),
            SubscriptionAction::UnsubscribeAll => session.record.subscriptions.unsubscribe_all(),
        }
        drop(sessions);
        let timestamp_ms = self.clock.epoch_ms();
        let process_id = process_id.map(str::to_string);
        match action {
            SubscriptionAction::Subscribe | SubscriptionAction::SubscribeAll => {
                self.emit(ConnectionEvent::Subscribed { session_id: id.clone(), timestamp_ms, process_id });
            }
            SubscriptionAction::Unsubscribe | SubscriptionAction::UnsubscribeAll => {
                self.emit(ConnectionEvent::Unsubscribed { session_id: id.clone(), timestamp_ms, process_id });
            }
        }
    }

    /// Refreshed on every inbound message receipt (spec §4.4).
    pub fn update_activity(&self, id: &SessionId) {
        let now = self.clock.epoch_ms();
        if let Some(session) = self.sessions.write().get_mut(id.as_str()) {
            session.record.touch(now);
        }
    }

    pub fn cleanup_inactive(&self, max_idle_ms: u64) -> usize {
        let now = self.clock.epoch_ms();
        let stale: Vec<SessionId> = self
            .sessions
            .read()
            .values()
            .filter(|s| s.record.is_inactive(now, max_idle_ms))
            .map(|s| s.record.id.clone())
            .collect();
        for id in &stale {
            self.remove_connection(id);
        }
        stale.len()
    }

    pub fn close_all(&self) {
        let ids: Vec<SessionId> = self.sessions.read().values().map(|s| s.record.id.clone()).collect();
        for id in &ids {
            self.remove_connection(id);
        }
    }

    pub fn subscribe_connection_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.connection_events.subscribe()
    }

    fn emit(&self, event: ConnectionEvent) {
        let _ = self.connection_events.send(event);
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
