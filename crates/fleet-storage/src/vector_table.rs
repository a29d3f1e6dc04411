// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Embedded fragment substrate: an in-memory table of [`Fragment`]s and
//! [`FragmentLink`]s with cosine similarity scoring, backed by the same
//! atomic [`Snapshot`] persistence as the rest of the system. The concrete
//! vector-database engine is out of scope for this system; this is the
//! simple linear-scan stand-in the fragment store is built on.

use crate::snapshot::Snapshot;
use fleet_core::{Fragment, FragmentId, FragmentLink, LinkId};
use indexmap::IndexMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorTableError {
    #[error("snapshot error: {0}")]
    Snapshot(#[from] crate::snapshot::SnapshotError),
    #[error("fragment vector has dimension {actual}, table dimension is {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// `(FragmentId, score)` sorted descending by score, score already mapped
/// into `[0,1]` via `s = 1 - d` for cosine distance `d`.
pub type ScoredFragment = (FragmentId, f32);

#[derive(Default)]
pub struct VectorTable {
    fragments: IndexMap<FragmentId, Fragment>,
    links: IndexMap<LinkId, FragmentLink>,
    dimension: Option<usize>,
}

impl VectorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed embedding dimension, set by the first inserted fragment
    /// (spec §4.6: "established on first create").
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn insert(&mut self, fragment: Fragment) -> Result<(), VectorTableError> {
        match self.dimension {
            None => self.dimension = Some(fragment.vector.len()),
            Some(d) if d != fragment.vector.len() => {
                return Err(VectorTableError::DimensionMismatch {
                    expected: d,
                    actual: fragment.vector.len(),
                })
            }
            Some(_) => {}
        }
        self.fragments.insert(fragment.id.clone(), fragment);
        Ok(())
    }

    pub fn get(&self, id: &FragmentId) -> Option<&Fragment> {
        self.fragments.get(id)
    }

    pub fn remove(&mut self, id: &FragmentId) -> Option<Fragment> {
        self.fragments.shift_remove(id)
    }

    pub fn count(&self) -> usize {
        self.fragments.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.values()
    }

    /// All fragments scored against `query` by cosine similarity, including
    /// those below any threshold — callers apply threshold/limit.
    pub fn score_all(&self, query: &[f32]) -> Vec<ScoredFragment> {
        self.fragments
            .values()
            .map(|f| (f.id.clone(), cosine_similarity(query, &f.vector)))
            .collect()
    }

    pub fn insert_link(&mut self, link: FragmentLink) {
        self.links.insert(link.id.clone(), link);
    }

    pub fn get_link(&self, id: &LinkId) -> Option<&FragmentLink> {
        self.links.get(id)
    }

    pub fn remove_link(&mut self, id: &LinkId) -> Option<FragmentLink> {
        self.links.shift_remove(id)
    }

    pub fn links(&self) -> impl Iterator<Item = &FragmentLink> {
        self.links.values()
    }

    pub fn save(&self, dir: &Path) -> Result<(), VectorTableError> {
        let fragments: Vec<&Fragment> = self.fragments.values().collect();
        let links: Vec<&FragmentLink> = self.links.values().collect();
        Snapshot::new(dir.join("fragments.json")).save(&fragments)?;
        Snapshot::new(dir.join("links.json")).save(&links)?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self, VectorTableError> {
        let fragments: Vec<Fragment> = Snapshot::new(dir.join("fragments.json")).load()?.unwrap_or_default();
        let links: Vec<FragmentLink> = Snapshot::new(dir.join("links.json")).load()?.unwrap_or_default();

        let mut table = Self::new();
        for fragment in fragments {
            table.dimension.get_or_insert(fragment.vector.len());
            table.fragments.insert(fragment.id.clone(), fragment);
        }
        for link in links {
            table.links.insert(link.id.clone(), link);
        }
        Ok(table)
    }
}

/// `s = 1 - d` where `d` is cosine distance: `s` equals the raw cosine
/// similarity of `a` and `b`, clamped into `[0,1]` (spec §4.6, §9 open
/// question — this store fixes the cosine mapping). Returns `0.0` for a
/// zero vector on either side.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

#[cfg(test)]
#[path = "vector_table_tests.rs"]
mod tests;
