// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fragment Store (spec §4.6): the vector+metadata table, hybrid search,
//! typed links, BFS traversal, and integrity reporting. Built on
//! `fleet_storage::VectorTable` for storage and `fleet_adapters::Embedder`
//! for the embedding pipeline.

use fleet_adapters::{EmbedError, Embedder};
use fleet_core::{
    Clock, ErrorKind, Fragment, FragmentId, FragmentKind, FragmentLink, FragmentStatus, LinkDirection, LinkId,
    LinkType, Priority,
};
use fleet_storage::{cosine_similarity, VectorTable, VectorTableError};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FragmentStoreError {
    #[error("embedding failed: {0}")]
    Embed(#[from] EmbedError),
    #[error("store error: {0}")]
    Table(#[from] VectorTableError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<FragmentStoreError> for fleet_core::FleetError {
    fn from(e: FragmentStoreError) -> Self {
        fleet_core::FleetError::new(ErrorKind::Internal, e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateFragmentRequest {
    pub title: String,
    pub body: String,
    pub kind: FragmentKind,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub related_ids: Vec<String>,
    pub priority: Option<Priority>,
}

impl Default for CreateFragmentRequest {
    fn default() -> Self {
        Self {
            title: String::new(),
            body: String::new(),
            kind: FragmentKind::Note,
            tags: Vec::new(),
            metadata: HashMap::new(),
            related_ids: Vec::new(),
            priority: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateFragmentPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<FragmentStatus>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct DateRange {
    pub after_ms: Option<u64>,
    pub before_ms: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct TimeFilter {
    pub created: Option<DateRange>,
    pub updated: Option<DateRange>,
    pub last_n_days: Option<u32>,
}

impl TimeFilter {
    fn validate(&self) -> Result<(), fleet_core::FleetError> {
        for range in [&self.created, &self.updated].into_iter().flatten() {
            if let (Some(after), Some(before)) = (range.after_ms, range.before_ms) {
                if after > before {
                    return Err(fleet_core::FleetError::invalid("time filter: after must be <= before"));
                }
            }
        }
        if let Some(n) = self.last_n_days {
            if n < 1 {
                return Err(fleet_core::FleetError::invalid("lastNDays must be >= 1"));
            }
        }
        Ok(())
    }

    fn matches(&self, fragment: &Fragment, now_ms: u64) -> bool {
        if let Some(range) = &self.created {
            if !in_range(fragment.created_ms, range) {
                return false;
            }
        }
        if let Some(range) = &self.updated {
            if !in_range(fragment.updated_ms, range) {
                return false;
            }
        }
        if let Some(n) = self.last_n_days {
            let window_ms = u64::from(n) * 24 * 60 * 60 * 1000;
            if fragment.updated_ms < now_ms.saturating_sub(window_ms) {
                return false;
            }
        }
        true
    }
}

fn in_range(field_ms: u64, range: &DateRange) -> bool {
    if let Some(after) = range.after_ms {
        if field_ms < after {
            return false;
        }
    }
    if let Some(before) = range.before_ms {
        if field_ms >= before {
            return false;
        }
    }
    true
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub tags: Vec<String>,
    pub kind: Option<FragmentKind>,
    pub status: Option<FragmentStatus>,
    pub full_text: Option<String>,
    pub time_filter: Option<TimeFilter>,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct SimilarityQuery {
    pub text: String,
    pub limit: usize,
    pub threshold: f32,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Pre,
    Post,
}

#[derive(Debug, Clone)]
pub struct AdvancedQuery {
    pub similarity: Option<SimilarityQuery>,
    pub search: SearchQuery,
    pub filter_mode: FilterMode,
}

#[derive(Debug, Clone)]
pub struct AdvancedResult {
    pub fragments: Vec<(Fragment, Option<f32>)>,
    /// The strategy actually used, which may differ from the requested one
    /// when `pre` is downgraded (spec §4.6).
    pub strategy_used: FilterMode,
}

#[derive(Debug, Clone)]
pub struct TraversalResult {
    pub start_fragment: FragmentId,
    pub nodes: HashMap<String, TraversalNode>,
    pub total_nodes: usize,
    pub max_depth_reached: u32,
    pub cycles_detected: usize,
}

#[derive(Debug, Clone)]
pub struct TraversalNode {
    pub fragment: Option<Fragment>,
    pub depth: u32,
    pub link_path: Vec<LinkId>,
}

#[derive(Debug, Clone)]
pub struct ClassifiedLink {
    pub link: FragmentLink,
    pub source_exists: bool,
    pub target_exists: bool,
}

#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub orphaned: Vec<ClassifiedLink>,
    pub duplicate_groups: Vec<Vec<LinkId>>,
    pub is_healthy: bool,
}

/// Multiplier applied to `limit` when `searchAdvanced` falls back to the
/// two-phase vector-then-filter plan (spec §4.6).
const ADVANCED_FETCH_MULTIPLIER: usize = 4;

const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.1;

pub struct FragmentStore {
    table: RwLock<VectorTable>,
    embedder: Arc<dyn Embedder>,
    clock: Arc<dyn Clock>,
}

impl FragmentStore {
    pub fn new(embedder: Arc<dyn Embedder>, clock: Arc<dyn Clock>) -> Self {
        Self {
            table: RwLock::new(VectorTable::new()),
            embedder,
            clock,
        }
    }

    pub fn load(table: VectorTable, embedder: Arc<dyn Embedder>, clock: Arc<dyn Clock>) -> Self {
        Self {
            table: RwLock::new(table),
            embedder,
            clock,
        }
    }

    pub fn save(&self, dir: &std::path::Path) -> Result<(), VectorTableError> {
        self.table.read().save(dir)
    }

    pub async fn create(&self, req: CreateFragmentRequest) -> Result<Fragment, FragmentStoreError> {
        let text = format!("{}\n\n{}", req.title, req.body);
        let vector = self.embedder.embed(&text).await?;
        let now = self.clock.epoch_ms();
        let fragment = Fragment {
            id: FragmentId::new(uuid::Uuid::new_v4().to_string()),
            title: req.title,
            body: req.body,
            kind: req.kind,
            created_ms: now,
            updated_ms: now,
            tags: req.tags,
            metadata: req.metadata,
            related_ids: req.related_ids,
            priority: req.priority,
            status: FragmentStatus::Active,
            vector,
        };
        self.table.write().insert(fragment.clone())?;
        Ok(fragment)
    }

    pub fn get(&self, id: &FragmentId) -> Option<Fragment> {
        self.table.read().get(id).cloned()
    }

    pub async fn update(&self, id: &FragmentId, patch: UpdateFragmentPatch) -> Result<Option<Fragment>, FragmentStoreError> {
        let Some(mut fragment) = self.get(id) else {
            return Ok(None);
        };
        let re_embed = patch.title.is_some() || patch.body.is_some();
        if let Some(title) = patch.title {
            fragment.title = title;
        }
        if let Some(body) = patch.body {
            fragment.body = body;
        }
        if let Some(tags) = patch.tags {
            fragment.tags = tags;
        }
        if let Some(status) = patch.status {
            fragment.status = status;
        }
        if let Some(metadata) = patch.metadata {
            fragment.metadata = metadata;
        }
        if re_embed {
            fragment.vector = self.embedder.embed(&fragment.embeddable_text()).await?;
        }
        fragment.updated_ms = self.clock.epoch_ms();
        self.table.write().insert(fragment.clone())?;
        Ok(Some(fragment))
    }

    pub fn delete(&self, id: &FragmentId) -> bool {
        self.table.write().remove(id).is_some()
    }

    pub fn get_all(&self, limit: Option<usize>) -> Vec<Fragment> {
        let table = self.table.read();
        match limit {
            Some(n) => table.iter().take(n).cloned().collect(),
            None => table.iter().cloned().collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.table.read().count()
    }

    pub fn search(&self, query: &SearchQuery) -> Result<Vec<Fragment>, fleet_core::FleetError> {
        if let Some(time_filter) = &query.time_filter {
            time_filter.validate()?;
        }
        let now = self.clock.epoch_ms();
        let matches: Vec<Fragment> = self
            .table
            .read()
            .iter()
            .filter(|f| matches_search(f, query, now))
            .cloned()
            .collect();
        let limit = if query.limit == 0 { matches.len() } else { query.limit };
        Ok(matches.into_iter().skip(query.offset).take(limit).collect())
    }

    pub async fn search_similar(&self, query: &SimilarityQuery) -> Result<Vec<(Fragment, f32)>, FragmentStoreError> {
        let embedding = self.embedder.embed(&query.text).await?;
        let table = self.table.read();
        let mut scored = table.score_all(&embedding);
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let results = scored
            .into_iter()
            .filter(|(_, score)| *score >= query.threshold)
            .filter_map(|(id, score)| table.get(&id).map(|f| (f.clone(), score)))
            .filter(|(f, _)| query.tags.is_empty() || query.tags.iter().any(|t| f.tags.contains(t)))
            .take(query.limit)
            .collect();
        Ok(results)
    }

    pub async fn search_advanced(&self, query: &AdvancedQuery) -> Result<AdvancedResult, FragmentStoreError> {
        if let Some(time_filter) = &query.search.time_filter {
            time_filter.validate().map_err(|e| FragmentStoreError::InvalidRequest(e.message))?;
        }

        let Some(similarity) = &query.similarity else {
            let now = self.clock.epoch_ms();
            let fragments: Vec<(Fragment, Option<f32>)> = self
                .table
                .read()
                .iter()
                .filter(|f| matches_search(f, &query.search, now))
                .map(|f| (f.clone(), None))
                .collect();
            let limit = if query.search.limit == 0 { fragments.len() } else { query.search.limit };
            return Ok(AdvancedResult {
                fragments: fragments.into_iter().skip(query.search.offset).take(limit).collect(),
                strategy_used: FilterMode::Post,
            });
        };

        // This substrate never supports a single combined pass; `pre`
        // downgrades to `post` (spec §4.6).
        let strategy_used = FilterMode::Post;
        let embedding = self.embedder.embed(&similarity.text).await?;
        let fetch_limit = similarity.limit.saturating_mul(ADVANCED_FETCH_MULTIPLIER).max(similarity.limit);

        let now = self.clock.epoch_ms();
        let table = self.table.read();
        let mut scored = table.score_all(&embedding);
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let fragments: Vec<(Fragment, Option<f32>)> = scored
            .into_iter()
            .filter(|(_, score)| *score >= similarity.threshold)
            .take(fetch_limit)
            .filter_map(|(id, score)| table.get(&id).map(|f| (f.clone(), score)))
            .filter(|(f, score)| {
                (similarity.tags.is_empty() || similarity.tags.iter().any(|t| f.tags.contains(t)))
                    && matches_search(f, &query.search, now)
                    && *score >= similarity.threshold
            })
            .map(|(f, score)| (f, Some(score)))
            .take(if query.search.limit == 0 { fetch_limit } else { query.search.limit })
            .collect();

        Ok(AdvancedResult { fragments, strategy_used })
    }

    pub fn create_link(
        &self,
        source: FragmentId,
        target: FragmentId,
        link_type: LinkType,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) -> Option<FragmentLink> {
        let now = self.clock.epoch_ms();
        let mut link = FragmentLink::new(source, target, link_type, now)?;
        link.metadata = metadata;
        self.table.write().insert_link(link.clone());
        Some(link)
    }

    pub fn delete_link(&self, id: &LinkId) -> bool {
        self.table.write().remove_link(id).is_some()
    }

    pub fn get_link(&self, id: &LinkId) -> Option<FragmentLink> {
        self.table.read().get_link(id).cloned()
    }

    pub fn query_links(
        &self,
        fragment_id: Option<&FragmentId>,
        source_id: Option<&FragmentId>,
        target_id: Option<&FragmentId>,
        link_type: Option<LinkType>,
        direction: LinkDirection,
        offset: usize,
        limit: usize,
    ) -> Vec<FragmentLink> {
        let table = self.table.read();
        let matches: Vec<FragmentLink> = table
            .links()
            .filter(|l| {
                if let Some(t) = link_type {
                    if l.link_type != t {
                        return false;
                    }
                }
                if let Some(sid) = source_id {
                    if l.source_id != *sid {
                        return false;
                    }
                }
                if let Some(tid) = target_id {
                    if l.target_id != *tid {
                        return false;
                    }
                }
                if let Some(fid) = fragment_id {
                    let outgoing = l.source_id == *fid;
                    let incoming = l.target_id == *fid;
                    let keep = match direction {
                        LinkDirection::Outgoing => outgoing,
                        LinkDirection::Incoming => incoming,
                        LinkDirection::Both => outgoing || incoming,
                    };
                    if !keep {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        let limit = if limit == 0 { matches.len() } else { limit };
        matches.into_iter().skip(offset).take(limit).collect()
    }

    pub fn get_links_for_fragment(&self, id: &FragmentId, direction: LinkDirection) -> Vec<FragmentLink> {
        self.query_links(Some(id), None, None, None, direction, 0, 0)
    }

    pub fn delete_links_for_fragment(&self, id: &FragmentId) -> usize {
        let to_remove: Vec<LinkId> = self.get_links_for_fragment(id, LinkDirection::Both).into_iter().map(|l| l.id).collect();
        let mut table = self.table.write();
        for link_id in &to_remove {
            table.remove_link(link_id);
        }
        to_remove.len()
    }

    pub fn find_orphaned(&self) -> Vec<ClassifiedLink> {
        let table = self.table.read();
        table
            .links()
            .filter_map(|l| {
                let source_exists = table.get(&l.source_id).is_some();
                let target_exists = table.get(&l.target_id).is_some();
                if source_exists && target_exists {
                    None
                } else {
                    Some(ClassifiedLink { link: l.clone(), source_exists, target_exists })
                }
            })
            .collect()
    }

    /// Groups links sharing `(source, target, type)` — these should never
    /// occur by construction, since link ids are minted from that triple
    /// (spec §4.6 `integrityReport`).
    pub fn integrity_report(&self) -> IntegrityReport {
        let orphaned = self.find_orphaned();
        let table = self.table.read();
        let mut groups: HashMap<(String, String, LinkType), Vec<LinkId>> = HashMap::new();
        for link in table.links() {
            groups
                .entry((link.source_id.as_str().to_string(), link.target_id.as_str().to_string(), link.link_type))
                .or_default()
                .push(link.id.clone());
        }
        let duplicate_groups: Vec<Vec<LinkId>> = groups.into_values().filter(|v| v.len() > 1).collect();
        let is_healthy = orphaned.is_empty() && duplicate_groups.is_empty();
        IntegrityReport { orphaned, duplicate_groups, is_healthy }
    }

    /// BFS from `start` with cycle detection (spec §4.6 "Traversal").
    pub fn traverse(
        &self,
        start: &FragmentId,
        max_depth: u32,
        link_types: Option<&[LinkType]>,
        direction: LinkDirection,
        include_fragments: bool,
    ) -> TraversalResult {
        let max_depth = max_depth.clamp(1, 10);
        let table = self.table.read();
        let mut visited: HashSet<String> = HashSet::new();
        let mut nodes: HashMap<String, TraversalNode> = HashMap::new();
        let mut cycles = 0usize;
        let mut max_depth_reached = 0u32;

        let mut queue: VecDeque<(FragmentId, u32, Vec<LinkId>)> = VecDeque::new();
        queue.push_back((start.clone(), 0, Vec::new()));
        visited.insert(start.as_str().to_string());
        nodes.insert(
            start.as_str().to_string(),
            TraversalNode {
                fragment: include_fragments.then(|| table.get(start).cloned()).flatten(),
                depth: 0,
                link_path: Vec::new(),
            },
        );

        while let Some((current, depth, path)) = queue.pop_front() {
            max_depth_reached = max_depth_reached.max(depth);
            if depth >= max_depth {
                continue;
            }
            let links = table
                .links()
                .filter(|l| {
                    let outgoing = l.source_id == current;
                    let incoming = l.target_id == current;
                    let in_direction = match direction {
                        LinkDirection::Outgoing => outgoing,
                        LinkDirection::Incoming => incoming,
                        LinkDirection::Both => outgoing || incoming,
                    };
                    in_direction && link_types.map(|ts| ts.contains(&l.link_type)).unwrap_or(true)
                });
            for link in links {
                let next = if link.source_id == current { link.target_id.clone() } else { link.source_id.clone() };
                let mut next_path = path.clone();
                next_path.push(link.id.clone());
                if visited.contains(next.as_str()) {
                    cycles += 1;
                    continue;
                }
                visited.insert(next.as_str().to_string());
                nodes.insert(
                    next.as_str().to_string(),
                    TraversalNode {
                        fragment: include_fragments.then(|| table.get(&next).cloned()).flatten(),
                        depth: depth + 1,
                        link_path: next_path.clone(),
                    },
                );
                queue.push_back((next, depth + 1, next_path));
            }
        }

        TraversalResult {
            start_fragment: start.clone(),
            total_nodes: nodes.len(),
            nodes,
            max_depth_reached,
            cycles_detected: cycles,
        }
    }
}

fn matches_search(fragment: &Fragment, query: &SearchQuery, now_ms: u64) -> bool {
    if let Some(kind) = query.kind {
        if fragment.kind != kind {
            return false;
        }
    }
    if let Some(status) = query.status {
        if fragment.status != status {
            return false;
        }
    }
    if !query.tags.is_empty() && !query.tags.iter().all(|t| fragment.tags.contains(t)) {
        return false;
    }
    if let Some(needle) = &query.full_text {
        let needle = needle.to_lowercase();
        let haystack = format!("{} {}", fragment.title, fragment.body).to_lowercase();
        if !haystack.contains(&needle) {
            return false;
        }
    }
    if let Some(time_filter) = &query.time_filter {
        if !time_filter.matches(fragment, now_ms) {
            return false;
        }
    }
    true
}

/// Cosine-similarity mapping is the one this store uses consistently (spec
/// §4.6 open question): `s = 1 - d` for cosine distance `d`, which is just
/// the raw cosine similarity already clamped into `[0,1]` by
/// `cosine_similarity`.
pub fn similarity_score(query: &[f32], vector: &[f32]) -> f32 {
    cosine_similarity(query, vector)
}

pub const DEFAULT_THRESHOLD: f32 = DEFAULT_SIMILARITY_THRESHOLD;

#[cfg(test)]
#[path = "fragment_tests.rs"]
mod tests;
