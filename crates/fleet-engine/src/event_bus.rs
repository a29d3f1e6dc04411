// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event Bus (spec §4.8): typed publish/subscribe, at-most-once per
//! subscriber, delivered in publish order. Built on `tokio::sync::broadcast`
//! so every subscriber gets every event independently; a single dispatching
//! worker is unnecessary because `broadcast` already serializes publishes
//! per channel.

use fleet_core::Event;
use tokio::sync::broadcast;

/// Default channel capacity. A slow subscriber that falls behind this many
/// events starts missing the oldest ones (`broadcast::error::RecvError::Lagged`);
/// callers that care about zero loss should drain promptly.
pub const DEFAULT_CAPACITY: usize = 1024;

/// A subscriber's receiving half. Dropping it unsubscribes.
pub struct Subscription {
    inner: broadcast::Receiver<Event>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.inner.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Publishes `Event`s to any number of subscribers. Cheap to clone; clones
/// share the same underlying channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Registers a new subscriber. It only receives events published after
    /// this call.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            inner: self.sender.subscribe(),
        }
    }

    /// Publishes an event to all current subscribers. A publish with zero
    /// subscribers is not an error; the event is simply dropped.
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
