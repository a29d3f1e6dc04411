// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Knowledge Store (spec §4.5): issues and the milestone singleton as
//! append-and-move markdown files, with the `[[ID]]` cross-reference graph
//! layered on top of `fleet_core::refs`.

use fleet_core::{
    is_valid_tag, resolve_refs, rewrite_refs, scan, validate_syntax, Clock, EntryKind, EntryStatus, ErrorKind,
    FleetError, Issue, KnowledgeId, Milestone, Priority, SyntaxIssue,
};
use fleet_storage::{parse_issue, parse_milestone, write_issue, write_milestone, KnowledgeLayout};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CreateIssueRequest {
    pub tags: Vec<String>,
    pub content: String,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub due_date: Option<String>,
    pub related_ids: Vec<String>,
    pub status: Option<EntryStatus>,
}

impl Default for CreateIssueRequest {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            content: String::new(),
            priority: Priority::Medium,
            assignee: None,
            due_date: None,
            related_ids: Vec::new(),
            status: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateIssuePatch {
    pub status: Option<EntryStatus>,
    pub tags: Option<Vec<String>>,
    pub content: Option<String>,
    pub priority: Option<Priority>,
    pub assignee: Option<Option<String>>,
    pub due_date: Option<Option<String>>,
    pub related_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub tags: Vec<String>,
    pub status: Option<EntryStatus>,
    pub priority: Option<Priority>,
    pub full_text: Option<String>,
    pub sort: Option<SortField>,
    pub descending: bool,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Timestamp,
    LastUpdated,
    Priority,
}

#[derive(Debug, Clone)]
pub struct BrokenRefs {
    pub file_path: String,
    pub source_id: String,
    pub broken_refs: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RefStats {
    pub total_refs: usize,
    pub unique_targets: usize,
    pub broken_refs: usize,
    pub top_referenced: Vec<(String, usize)>,
    pub top_referencing: Vec<(String, usize)>,
}

/// Serializes `next(type)` id-minting (spec §4.5: "concurrent mint requests
/// in the same process are serialized").
pub struct KnowledgeStore {
    layout: KnowledgeLayout,
    clock: Arc<dyn Clock>,
    mint_lock: Mutex<()>,
}

impl KnowledgeStore {
    pub fn new(root: impl Into<std::path::PathBuf>, clock: Arc<dyn Clock>) -> std::io::Result<Self> {
        let layout = KnowledgeLayout::new(root);
        layout.ensure_dirs()?;
        Ok(Self {
            layout,
            clock,
            mint_lock: Mutex::new(()),
        })
    }

    pub fn create(&self, prefix: &str, req: CreateIssueRequest) -> Result<Issue, FleetError> {
        if req.tags.iter().any(|t| !is_valid_tag(t)) {
            return Err(FleetError::invalid("tags must match [A-Za-z0-9_-]+"));
        }
        let _guard = self.mint_lock.lock();
        let n = self.layout.next_id(prefix);
        let id = KnowledgeId::new(format!("{prefix}_{n}"));
        let now = iso_now(&*self.clock);
        let issue = Issue {
            id,
            status: req.status.unwrap_or(EntryStatus::Open),
            timestamp: now.clone(),
            last_updated: now,
            tags: req.tags,
            metadata: HashMap::new(),
            content: req.content,
            priority: req.priority,
            assignee: req.assignee,
            due_date: req.due_date,
            related_ids: req.related_ids,
        };
        write_issue(&self.layout, &issue).map_err(|e| FleetError::new(ErrorKind::Internal, e.to_string()))?;
        Ok(issue)
    }

    pub fn get(&self, id: &KnowledgeId) -> Option<Issue> {
        self.locate(id).map(|(_, issue)| issue)
    }

    fn locate(&self, id: &KnowledgeId) -> Option<(std::path::PathBuf, Issue)> {
        for status in EntryStatus::ALL {
            let path = self.layout.issue_path(status, id);
            if let Ok(raw) = fs::read_to_string(&path) {
                if let Ok(issue) = parse_issue(&path, &raw) {
                    return Some((path, issue));
                }
            }
        }
        None
    }

    pub fn update(&self, id: &KnowledgeId, patch: UpdateIssuePatch) -> Result<Issue, FleetError> {
        let (old_path, mut issue) = self
            .locate(id)
            .ok_or_else(|| FleetError::not_found(format!("no issue {id}")))?;
        if let Some(tags) = patch.tags {
            if tags.iter().any(|t| !is_valid_tag(t)) {
                return Err(FleetError::invalid("tags must match [A-Za-z0-9_-]+"));
            }
            issue.tags = tags;
        }
        if let Some(content) = patch.content {
            issue.content = content;
        }
        if let Some(priority) = patch.priority {
            issue.priority = priority;
        }
        if let Some(assignee) = patch.assignee {
            issue.assignee = assignee;
        }
        if let Some(due_date) = patch.due_date {
            issue.due_date = due_date;
        }
        if let Some(related_ids) = patch.related_ids {
            issue.related_ids = related_ids;
        }
        let status_changed = patch.status.is_some_and(|s| s != issue.status);
        if let Some(status) = patch.status {
            issue.status = status;
        }
        issue.last_updated = iso_now(&*self.clock);

        if status_changed {
            let new_path = self.layout.issue_path(issue.status, &issue.id);
            write_issue(&self.layout, &issue).map_err(|e| FleetError::new(ErrorKind::Internal, e.to_string()))?;
            if old_path != new_path {
                let _ = fs::remove_file(&old_path);
            }
        } else {
            write_issue(&self.layout, &issue).map_err(|e| FleetError::new(ErrorKind::Internal, e.to_string()))?;
        }
        Ok(issue)
    }

    /// Deleting an issue referenced elsewhere is allowed (spec §4.5); the
    /// reference simply becomes broken, surfaced by `find_broken`.
    pub fn delete(&self, id: &KnowledgeId) -> bool {
        let Some((path, _)) = self.locate(id) else {
            return false;
        };
        fs::remove_file(path).is_ok()
    }

    pub fn get_milestone(&self) -> Option<Milestone> {
        let path = self.layout.goal_path();
        let raw = fs::read_to_string(&path).ok()?;
        parse_milestone(&path, &raw).ok()
    }

    /// Creates the milestone singleton if absent, else loads and returns the
    /// stored one unmodified. Status changes to a milestone never move its
    /// file (spec §4.5).
    pub fn set_milestone(&self, mutate: impl FnOnce(&mut Milestone)) -> Result<Milestone, FleetError> {
        let mut milestone = self.get_milestone().unwrap_or_else(|| {
            let now = iso_now(&*self.clock);
            Milestone {
                id: KnowledgeId::new(Milestone::SINGLETON_ID),
                title: String::new(),
                status: EntryStatus::Open,
                timestamp: now.clone(),
                last_updated: now,
                tags: Vec::new(),
                metadata: HashMap::new(),
                content: String::new(),
                target_date: None,
                progress: 0,
                related_issue_ids: Vec::new(),
            }
        });
        mutate(&mut milestone);
        milestone.last_updated = iso_now(&*self.clock);
        write_milestone(&self.layout, &milestone).map_err(|e| FleetError::new(ErrorKind::Internal, e.to_string()))?;
        Ok(milestone)
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<Issue> {
        let mut matches: Vec<Issue> = self
            .layout
            .all_issue_paths()
            .into_iter()
            .filter_map(|path| fs::read_to_string(&path).ok().and_then(|raw| parse_issue(&path, &raw).ok()))
            .filter(|issue| matches_query(issue, query))
            .collect();

        if let Some(field) = query.sort {
            matches.sort_by(|a, b| compare_by(field, a, b));
            if query.descending {
                matches.reverse();
            }
        }

        let limit = if query.limit == 0 { matches.len() } else { query.limit };
        matches.into_iter().skip(query.offset).take(limit).collect()
    }

    pub fn parse_refs(&self, text: &str) -> Vec<fleet_core::RefSpan> {
        scan(text)
    }

    pub fn resolve_refs(&self, text: &str) -> Vec<fleet_core::ResolvedRef> {
        resolve_refs(text, |id| self.locate(&KnowledgeId::new(id.to_string())).is_some())
    }

    pub fn validate_syntax(&self, text: &str) -> Vec<SyntaxIssue> {
        validate_syntax(text)
    }

    pub fn find_broken(&self) -> Vec<BrokenRefs> {
        let mut out = Vec::new();
        for (path, id, content) in self.all_entries() {
            let broken: Vec<String> = scan(&content)
                .into_iter()
                .map(|s| s.id)
                .filter(|id| self.locate(&KnowledgeId::new(id.clone())).is_none())
                .collect();
            if !broken.is_empty() {
                out.push(BrokenRefs {
                    file_path: path.display().to_string(),
                    source_id: id,
                    broken_refs: broken,
                });
            }
        }
        out
    }

    /// Rewrites every `[[old_id]]` occurrence across every file, including
    /// the milestone singleton (spec §4.5 `rename`: "rewrites all `[[oldId]]`
    /// occurrences across all files"). The id itself never changes, only
    /// references to it.
    pub fn rename(&self, old_id: &str, new_id: &str, dry_run: bool) -> Vec<String> {
        let mut updated = Vec::new();
        for path in self.layout.all_issue_paths() {
            let Ok(raw) = fs::read_to_string(&path) else { continue };
            let Ok(issue) = parse_issue(&path, &raw) else { continue };
            let (rewritten, count) = rewrite_refs(&issue.content, old_id, new_id);
            if count == 0 {
                continue;
            }
            updated.push(issue.id.as_str().to_string());
            if !dry_run {
                let mut issue = issue;
                issue.content = rewritten;
                let _ = write_issue(&self.layout, &issue);
            }
        }

        let goal_path = self.layout.goal_path();
        if let Ok(raw) = fs::read_to_string(&goal_path) {
            if let Ok(milestone) = parse_milestone(&goal_path, &raw) {
                let (rewritten, count) = rewrite_refs(&milestone.content, old_id, new_id);
                if count > 0 {
                    updated.push(milestone.id.as_str().to_string());
                    if !dry_run {
                        let mut milestone = milestone;
                        milestone.content = rewritten;
                        let _ = write_milestone(&self.layout, &milestone);
                    }
                }
            }
        }
        updated
    }

    pub fn stats(&self) -> RefStats {
        let mut referenced_counts: HashMap<String, usize> = HashMap::new();
        let mut referencing_counts: HashMap<String, usize> = HashMap::new();
        let mut total = 0usize;
        let mut broken = 0usize;

        for (_, id, content) in self.all_entries() {
            let spans = scan(&content);
            if !spans.is_empty() {
                *referencing_counts.entry(id).or_insert(0) += spans.len();
            }
            for span in spans {
                total += 1;
                let exists = self.locate(&KnowledgeId::new(span.id.clone())).is_some();
                if !exists {
                    broken += 1;
                }
                *referenced_counts.entry(span.id).or_insert(0) += 1;
            }
        }

        RefStats {
            total_refs: total,
            unique_targets: referenced_counts.len(),
            broken_refs: broken,
            top_referenced: top_n(referenced_counts, 10),
            top_referencing: top_n(referencing_counts, 10),
        }
    }

    /// Every cross-reference-bearing file: each issue plus the milestone
    /// singleton, as `(path, id, content)`. `rename` stays a dedicated loop
    /// since it also needs to write back through the right serializer.
    fn all_entries(&self) -> Vec<(std::path::PathBuf, String, String)> {
        let mut out: Vec<(std::path::PathBuf, String, String)> = self
            .layout
            .all_issue_paths()
            .into_iter()
            .filter_map(|path| {
                let raw = fs::read_to_string(&path).ok()?;
                let issue = parse_issue(&path, &raw).ok()?;
                Some((path, issue.id.as_str().to_string(), issue.content))
            })
            .collect();
        let goal_path = self.layout.goal_path();
        if let Ok(raw) = fs::read_to_string(&goal_path) {
            if let Ok(milestone) = parse_milestone(&goal_path, &raw) {
                out.push((goal_path, milestone.id.as_str().to_string(), milestone.content));
            }
        }
        out
    }
}

fn top_n(counts: HashMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(n);
    entries
}

fn matches_query(issue: &Issue, query: &SearchQuery) -> bool {
    if let Some(status) = query.status {
        if issue.status != status {
            return false;
        }
    }
    if let Some(priority) = query.priority {
        if issue.priority != priority {
            return false;
        }
    }
    if !query.tags.is_empty() && !query.tags.iter().any(|t| issue.tags.contains(t)) {
        return false;
    }
    if let Some(needle) = &query.full_text {
        if !issue.content.to_lowercase().contains(&needle.to_lowercase()) {
            return false;
        }
    }
    true
}

fn compare_by(field: SortField, a: &Issue, b: &Issue) -> std::cmp::Ordering {
    match field {
        SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
        SortField::LastUpdated => a.last_updated.cmp(&b.last_updated),
        SortField::Priority => a.priority.cmp(&b.priority),
    }
}

fn iso_now(clock: &dyn Clock) -> String {
    let ms = clock.epoch_ms();
    let secs = (ms / 1000) as i64;
    let nanos = ((ms % 1000) * 1_000_000) as u32;
    chrono::DateTime::from_timestamp(secs, nanos)
        .unwrap_or_default()
        .to_rfc3339()
}

pub fn entry_kind_prefix(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Issue => "ISSUE",
        EntryKind::Milestone => "GOAL",
    }
}

#[cfg(test)]
#[path = "knowledge_tests.rs"]
mod tests;
