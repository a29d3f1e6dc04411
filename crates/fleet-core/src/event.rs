// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus payloads (spec §4.8). Each variant is one topic family; the
//! bus dispatches by variant so a subscriber can filter with a `matches!`
//! without string topic names.

use crate::fragment::{Fragment, FragmentLink};
use crate::knowledge::{Issue, Milestone};
use crate::process::{LogEntry, ProcessRecord};
use crate::queue::QueueEntry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "process.created")]
    ProcessCreated { record: ProcessRecord },
    #[serde(rename = "process.started")]
    ProcessStarted { record: ProcessRecord },
    #[serde(rename = "process.log")]
    ProcessLog {
        process_id: String,
        entry: LogEntry,
    },
    #[serde(rename = "process.exited")]
    ProcessExited { record: ProcessRecord },

    #[serde(rename = "queue.changed")]
    QueueChanged {
        running: usize,
        queued: usize,
        paused: bool,
        entries: Option<Vec<QueueEntry>>,
    },

    #[serde(rename = "knowledge.created")]
    KnowledgeCreated { issue: Issue },
    #[serde(rename = "knowledge.updated")]
    KnowledgeUpdated { issue: Issue },
    #[serde(rename = "knowledge.deleted")]
    KnowledgeDeleted { id: String },
    #[serde(rename = "milestone.updated")]
    MilestoneUpdated { milestone: Milestone },

    #[serde(rename = "fragment.created")]
    FragmentCreated { fragment: Fragment },
    #[serde(rename = "fragment.updated")]
    FragmentUpdated { fragment: Fragment },
    #[serde(rename = "fragment.deleted")]
    FragmentDeleted { id: String },

    #[serde(rename = "link.created")]
    LinkCreated { link: FragmentLink },
    #[serde(rename = "link.deleted")]
    LinkDeleted { id: String },
}

impl Event {
    /// The process id an event is scoped to, if any — used by the hub to
    /// route `process.*` events to subscribed sessions (spec §4.4).
    pub fn process_id(&self) -> Option<&str> {
        match self {
            Event::ProcessCreated { record }
            | Event::ProcessStarted { record }
            | Event::ProcessExited { record } => Some(record.id.as_str()),
            Event::ProcessLog { process_id, .. } => Some(process_id.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
