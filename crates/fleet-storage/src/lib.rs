// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persistence layer: atomic snapshots, the knowledge-store file layout and
//! markdown codec, and the embedded fragment/link substrate.

mod knowledge_fs;
mod snapshot;
mod vector_table;

pub use knowledge_fs::{
    parse_issue, parse_milestone, rename_or_copy, write_issue, write_milestone, KnowledgeFsError,
    KnowledgeLayout,
};
pub use snapshot::{rotate_bak_path, Snapshot, SnapshotError};
pub use vector_table::{cosine_similarity, ScoredFragment, VectorTable, VectorTableError};
