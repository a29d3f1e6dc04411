// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The `fleetd` daemon: the connection hub, knowledge store, fragment
//! store, and tool surface that sit on top of `fleet-engine`'s process
//! orchestration, plus the daemon's own configuration.

pub mod config;
pub mod fragment;
pub mod hub;
pub mod knowledge;
pub mod tools;

pub use config::Config;
pub use fragment::FragmentStore;
pub use hub::{ConnectionEvent, Hub, Outbox, SubscriptionAction};
pub use knowledge::KnowledgeStore;
pub use tools::{ToolDescriptor, ToolResponse, Tools};
