// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue and milestone entry types for the knowledge store (spec §3.4, §4.5).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// `{PREFIX}_{n}` identifier, e.g. `ISSUE_42`. The milestone singleton
    /// uses the fixed id `GOAL`.
    pub struct KnowledgeId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Issue,
    Milestone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryStatus {
    Open,
    InProgress,
    Completed,
    Archived,
}

impl EntryStatus {
    /// The on-disk subdirectory this status lives under (spec §4.5
    /// `STATUS_FOLDERS`).
    pub fn folder(self) -> &'static str {
        match self {
            EntryStatus::Open => "open",
            EntryStatus::InProgress => "in-progress",
            EntryStatus::Completed => "completed",
            EntryStatus::Archived => "archived",
        }
    }

    pub const ALL: [EntryStatus; 4] = [
        EntryStatus::Open,
        EntryStatus::InProgress,
        EntryStatus::Completed,
        EntryStatus::Archived,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: KnowledgeId,
    pub status: EntryStatus,
    pub timestamp: String,
    pub last_updated: String,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub content: String,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub due_date: Option<String>,
    pub related_ids: Vec<String>,
}

impl Issue {
    pub fn kind(&self) -> EntryKind {
        EntryKind::Issue
    }
}

/// The singleton milestone, always stored at `GOAL.md` regardless of status
/// (spec §4.5: "status change of a milestone never moves").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: KnowledgeId,
    pub title: String,
    pub status: EntryStatus,
    pub timestamp: String,
    pub last_updated: String,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub content: String,
    pub target_date: Option<String>,
    pub progress: u8,
    pub related_issue_ids: Vec<String>,
}

impl Milestone {
    pub const SINGLETON_ID: &'static str = "GOAL";

    pub fn kind(&self) -> EntryKind {
        EntryKind::Milestone
    }

    /// Clamps to the valid `[0,100]` range (spec §3.4 invariant).
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
    }
}

/// Validates the tag format required by `create` (spec §4.5):
/// `[A-Za-z0-9_-]+`.
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
#[path = "knowledge_tests.rs"]
mod tests;
