// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket session table entries and subscription routing (spec §3.3, §4.4).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

crate::define_id! {
    /// Unique identifier for a hub-registered WebSocket connection.
    pub struct SessionId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Reconnecting,
    Error,
}

/// Which processes a session receives `process.*` events for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subscriptions {
    pub process_ids: HashSet<String>,
    pub all_processes: bool,
}

impl Subscriptions {
    pub fn subscribe(&mut self, process_id: impl Into<String>) {
        self.process_ids.insert(process_id.into());
    }

    pub fn unsubscribe(&mut self, process_id: &str) {
        self.process_ids.remove(process_id);
    }

    pub fn subscribe_all(&mut self) {
        self.all_processes = true;
    }

    pub fn unsubscribe_all(&mut self) {
        self.all_processes = false;
        self.process_ids.clear();
    }

    /// Whether this session should receive an event scoped to `process_id`
    /// (spec §4.4 subscription routing).
    pub fn matches(&self, process_id: &str) -> bool {
        self.all_processes || self.process_ids.contains(process_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub state: ConnectionState,
    pub connected_at_ms: u64,
    pub last_activity_ms: u64,
    pub subscriptions: Subscriptions,
    pub metadata: serde_json::Value,
}

impl SessionRecord {
    pub fn new(id: SessionId, now_ms: u64, metadata: serde_json::Value) -> Self {
        Self {
            id,
            state: ConnectionState::Connected,
            connected_at_ms: now_ms,
            last_activity_ms: now_ms,
            subscriptions: Subscriptions::default(),
            metadata,
        }
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.last_activity_ms = now_ms;
    }

    pub fn is_inactive(&self, now_ms: u64, max_idle_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_activity_ms) > max_idle_ms
    }
}

/// AND-combined predicate used by `getConnections`/`broadcast` filtering
/// (spec §4.4 `ConnectionFilter`).
#[derive(Debug, Clone, Default)]
pub struct ConnectionFilter {
    pub session_ids: Option<HashSet<String>>,
    pub states: Option<HashSet<ConnectionState>>,
    pub subscribed_to_all: Option<bool>,
    pub process_ids: Option<HashSet<String>>,
    pub inactive_since_ms: Option<u64>,
}

impl ConnectionFilter {
    pub fn matches(&self, session: &SessionRecord, now_ms: u64) -> bool {
        if let Some(ids) = &self.session_ids {
            if !ids.contains(session.id.as_str()) {
                return false;
            }
        }
        if let Some(states) = &self.states {
            if !states.contains(&session.state) {
                return false;
            }
        }
        if let Some(all) = self.subscribed_to_all {
            if session.subscriptions.all_processes != all {
                return false;
            }
        }
        if let Some(pids) = &self.process_ids {
            if !pids
                .iter()
                .any(|p| session.subscriptions.matches(p))
            {
                return false;
            }
        }
        if let Some(max_idle) = self.inactive_since_ms {
            if !session.is_inactive(now_ms, max_idle) {
                return false;
            }
        }
        true
    }
}

impl std::hash::Hash for ConnectionState {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
