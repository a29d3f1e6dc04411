// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fragment and fragment-link types for the vector-indexed knowledge store
//! (spec §3.5, §3.6, §4.6).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Opaque UUID-string identifier.
    pub struct FragmentId;
}

crate::define_id! {
    /// `link_{source}_{target}_{type}`, minted by [`FragmentLink::mint_id`].
    pub struct LinkId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Question,
    Answer,
    Note,
    Documentation,
    Issue,
    Solution,
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentStatus {
    Active,
    Archived,
    Draft,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    pub id: FragmentId,
    pub title: String,
    pub body: String,
    pub kind: FragmentKind,
    pub created_ms: u64,
    pub updated_ms: u64,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub related_ids: Vec<String>,
    pub priority: Option<crate::knowledge::Priority>,
    pub status: FragmentStatus,
    pub vector: Vec<f32>,
}

impl Fragment {
    /// Invariant (spec §3.5): `vector.length == D`.
    pub fn has_dimension(&self, d: usize) -> bool {
        self.vector.len() == d
    }

    /// Text the embedding pipeline embeds: `(title, body)` is the preimage
    /// of `vector` (spec §3.5 invariant).
    pub fn embeddable_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Answers,
    References,
    Related,
    Supersedes,
}

impl LinkType {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkType::Answers => "answers",
            LinkType::References => "references",
            LinkType::Related => "related",
            LinkType::Supersedes => "supersedes",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentLink {
    pub id: LinkId,
    pub source_id: FragmentId,
    pub target_id: FragmentId,
    pub link_type: LinkType,
    pub created_ms: u64,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl FragmentLink {
    /// `link_{sourceId}_{targetId}_{linkType}` (spec §3.6).
    pub fn mint_id(source_id: &FragmentId, target_id: &FragmentId, link_type: LinkType) -> LinkId {
        LinkId::new(format!(
            "link_{}_{}_{}",
            source_id.as_str(),
            target_id.as_str(),
            link_type.as_str()
        ))
    }

    pub fn new(source_id: FragmentId, target_id: FragmentId, link_type: LinkType, now_ms: u64) -> Option<Self> {
        if source_id == target_id {
            return None;
        }
        let id = Self::mint_id(&source_id, &target_id, link_type);
        Some(Self {
            id,
            source_id,
            target_id,
            link_type,
            created_ms: now_ms,
            metadata: None,
        })
    }
}

/// Direction of traversal relative to a fragment id (spec §4.6 `queryLinks`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDirection {
    Outgoing,
    Incoming,
    Both,
}

#[cfg(test)]
#[path = "fragment_tests.rs"]
mod tests;
