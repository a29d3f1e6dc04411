// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout and markdown+frontmatter codec for the knowledge store
//! (spec §4.5). Files live under `{root}/{status}/{ID}.md`; the milestone is
//! the singleton `{root}/GOAL.md`.

use chrono::{DateTime, Utc};
use fleet_core::{EntryStatus, Issue, KnowledgeId, Milestone, Priority};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnowledgeFsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("frontmatter error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("malformed knowledge file {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

/// The four status subdirectories plus the root, addressed by `{root}`.
#[derive(Debug, Clone)]
pub struct KnowledgeLayout {
    root: PathBuf,
}

impl KnowledgeLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn folder(&self, status: EntryStatus) -> PathBuf {
        self.root.join(status.folder())
    }

    pub fn issue_path(&self, status: EntryStatus, id: &KnowledgeId) -> PathBuf {
        self.folder(status).join(format!("{}.md", id.as_str()))
    }

    pub fn goal_path(&self) -> PathBuf {
        self.root.join("GOAL.md")
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        for status in EntryStatus::ALL {
            fs::create_dir_all(self.folder(status))?;
        }
        Ok(())
    }

    /// All `{id}.md` paths across every status folder, in status-folder
    /// scan order (spec §4.5 `get` searches "the four folders in status
    /// order").
    pub fn all_issue_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for status in EntryStatus::ALL {
            let dir = self.folder(status);
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "md") {
                    paths.push(path);
                }
            }
        }
        paths
    }

    /// Scans every status folder for files whose stem matches
    /// `{prefix}_{n}` and returns `max(n) + 1` (spec §4.5 `next(type)`).
    pub fn next_id(&self, prefix: &str) -> u64 {
        let mut max_n = 0u64;
        for path in self.all_issue_paths() {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(rest) = stem.strip_prefix(prefix).and_then(|r| r.strip_prefix('_')) else {
                continue;
            };
            if let Ok(n) = rest.parse::<u64>() {
                max_n = max_n.max(n);
            }
        }
        max_n + 1
    }
}

/// Frontmatter shared by issue and milestone files plus the raw markdown
/// body, as stored on disk (spec §4.5 "File format").
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Frontmatter {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    status: String,
    timestamp: DateTime<Utc>,
    #[serde(rename = "lastUpdated")]
    last_updated: DateTime<Utc>,
    tags: Vec<String>,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    assignee: Option<String>,
    #[serde(default, rename = "dueDate")]
    due_date: Option<String>,
    #[serde(default, rename = "relatedIds")]
    related_ids: Vec<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "targetDate")]
    target_date: Option<String>,
    #[serde(default)]
    progress: Option<u8>,
    #[serde(default, rename = "relatedIssueIds")]
    related_issue_ids: Vec<String>,
}

fn status_from_str(s: &str) -> Result<EntryStatus, String> {
    EntryStatus::ALL
        .into_iter()
        .find(|st| st.folder() == s)
        .ok_or_else(|| format!("unknown status {s:?}"))
}

fn priority_from_str(s: &str) -> Result<Priority, String> {
    match s {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        other => Err(format!("unknown priority {other:?}")),
    }
}

fn priority_as_str(p: Priority) -> &'static str {
    match p {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

/// Splits a `---\n...\n---\n\nbody` document into its frontmatter and body.
fn split_frontmatter(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix("---\n")?;
    let end = rest.find("\n---\n")?;
    let frontmatter = &rest[..end];
    let body = rest[end + 5..].trim_start_matches('\n');
    Some((frontmatter, body))
}

fn render(frontmatter: &Frontmatter, body: &str) -> Result<String, KnowledgeFsError> {
    let yaml = serde_yaml::to_string(frontmatter)?;
    Ok(format!("---\n{yaml}---\n\n{body}"))
}

fn issue_to_frontmatter(issue: &Issue) -> Frontmatter {
    Frontmatter {
        id: issue.id.as_str().to_string(),
        kind: "issue".to_string(),
        status: issue.status.folder().to_string(),
        timestamp: parse_or_now(&issue.timestamp),
        last_updated: parse_or_now(&issue.last_updated),
        tags: issue.tags.clone(),
        metadata: issue.metadata.clone(),
        priority: Some(priority_as_str(issue.priority).to_string()),
        assignee: issue.assignee.clone(),
        due_date: issue.due_date.clone(),
        related_ids: issue.related_ids.clone(),
        title: None,
        target_date: None,
        progress: None,
        related_issue_ids: Vec::new(),
    }
}

fn parse_or_now(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub fn write_issue(layout: &KnowledgeLayout, issue: &Issue) -> Result<(), KnowledgeFsError> {
    let frontmatter = issue_to_frontmatter(issue);
    let doc = render(&frontmatter, &issue.content)?;
    let path = layout.issue_path(issue.status, &issue.id);
    atomic_write(&path, &doc)
}

pub fn parse_issue(path: &Path, raw: &str) -> Result<Issue, KnowledgeFsError> {
    let (fm_text, body) = split_frontmatter(raw).ok_or_else(|| KnowledgeFsError::Malformed {
        path: path.to_owned(),
        message: "missing frontmatter delimiters".into(),
    })?;
    let frontmatter: Frontmatter = serde_yaml::from_str(fm_text)?;
    let status = status_from_str(&frontmatter.status).map_err(|message| KnowledgeFsError::Malformed {
        path: path.to_owned(),
        message,
    })?;
    let priority = match frontmatter.priority.as_deref() {
        Some(p) => priority_from_str(p).map_err(|message| KnowledgeFsError::Malformed {
            path: path.to_owned(),
            message,
        })?,
        None => Priority::Medium,
    };
    Ok(Issue {
        id: KnowledgeId::new(frontmatter.id),
        status,
        timestamp: frontmatter.timestamp.to_rfc3339(),
        last_updated: frontmatter.last_updated.to_rfc3339(),
        tags: frontmatter.tags,
        metadata: frontmatter.metadata,
        content: body.to_string(),
        priority,
        assignee: frontmatter.assignee,
        due_date: frontmatter.due_date,
        related_ids: frontmatter.related_ids,
    })
}

pub fn write_milestone(layout: &KnowledgeLayout, milestone: &Milestone) -> Result<(), KnowledgeFsError> {
    let frontmatter = Frontmatter {
        id: milestone.id.as_str().to_string(),
        kind: "milestone".to_string(),
        status: milestone.status.folder().to_string(),
        timestamp: parse_or_now(&milestone.timestamp),
        last_updated: parse_or_now(&milestone.last_updated),
        tags: milestone.tags.clone(),
        metadata: milestone.metadata.clone(),
        priority: None,
        assignee: None,
        due_date: None,
        related_ids: Vec::new(),
        title: Some(milestone.title.clone()),
        target_date: milestone.target_date.clone(),
        progress: Some(milestone.progress),
        related_issue_ids: milestone.related_issue_ids.clone(),
    };
    let doc = render(&frontmatter, &milestone.content)?;
    atomic_write(&layout.goal_path(), &doc)
}

pub fn parse_milestone(path: &Path, raw: &str) -> Result<Milestone, KnowledgeFsError> {
    let (fm_text, body) = split_frontmatter(raw).ok_or_else(|| KnowledgeFsError::Malformed {
        path: path.to_owned(),
        message: "missing frontmatter delimiters".into(),
    })?;
    let frontmatter: Frontmatter = serde_yaml::from_str(fm_text)?;
    let status = status_from_str(&frontmatter.status).map_err(|message| KnowledgeFsError::Malformed {
        path: path.to_owned(),
        message,
    })?;
    Ok(Milestone {
        id: KnowledgeId::new(frontmatter.id),
        title: frontmatter.title.unwrap_or_default(),
        status,
        timestamp: frontmatter.timestamp.to_rfc3339(),
        last_updated: frontmatter.last_updated.to_rfc3339(),
        tags: frontmatter.tags,
        metadata: frontmatter.metadata,
        content: body.to_string(),
        target_date: frontmatter.target_date,
        progress: frontmatter.progress.unwrap_or(0),
        related_issue_ids: frontmatter.related_issue_ids,
    })
}

/// Temp-file + rename write, matching the substrate-wide atomic write
/// pattern (spec §5 "Shared resources").
fn atomic_write(path: &Path, contents: &str) -> Result<(), KnowledgeFsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("md.tmp");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    rename_or_copy(&tmp_path, path)
}

/// Moves a file between status folders. Prefers `rename`; falls back to
/// copy+delete when the rename fails (e.g. `EXDEV`, a cross-device rename
/// across different mounted volumes) — spec §9 redesign note: "preserve
/// this pattern verbatim".
pub fn rename_or_copy(from: &Path, to: &Path) -> Result<(), KnowledgeFsError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)?;
    Ok(())
}

#[cfg(test)]
#[path = "knowledge_fs_tests.rs"]
mod tests;
