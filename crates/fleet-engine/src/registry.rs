// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process Registry (spec §4.1): the single owner of `ProcessRecord`s.
//! Readers get deep copies; writers go through `update`'s mutator, which is
//! validated against the supervisor state machine before it commits.

use fleet_core::{ErrorKind, FleetError, LogEntry, LogStream, ProcessId, ProcessRecord, ProcessStatus};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ProcessFilter {
    pub status_in: Option<Vec<ProcessStatus>>,
    pub id_in: Option<Vec<ProcessId>>,
    pub title_contains: Option<String>,
    pub start_after_ms: Option<u64>,
    pub start_before_ms: Option<u64>,
}

impl ProcessFilter {
    fn matches(&self, record: &ProcessRecord) -> bool {
        if let Some(statuses) = &self.status_in {
            if !statuses.contains(&record.status) {
                return false;
            }
        }
        if let Some(ids) = &self.id_in {
            if !ids.contains(&record.id) {
                return false;
            }
        }
        if let Some(needle) = &self.title_contains {
            if !record.title.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(after) = self.start_after_ms {
            if record.start_time_ms < after {
                return false;
            }
        }
        if let Some(before) = self.start_before_ms {
            if record.start_time_ms >= before {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    StartTime,
    Title,
    Status,
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy)]
pub struct Sort {
    pub key: SortKey,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Page {
    pub offset: usize,
    pub limit: Option<usize>,
}

/// In-memory table of `ProcessRecord`s guarded by a single lock (spec §5:
/// "the process table ... is guarded by a single owner").
#[derive(Default)]
pub struct ProcessRegistry {
    records: RwLock<HashMap<String, ProcessRecord>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, record: ProcessRecord) {
        self.records.write().insert(record.id.as_str().to_string(), record);
    }

    /// Deep copy of the stored record; callers may not mutate shared state.
    pub fn get(&self, id: &ProcessId) -> Option<ProcessRecord> {
        self.records.read().get(id.as_str()).cloned()
    }

    /// Applies `mutator` atomically with respect to other registry
    /// operations. If the mutator changes `status`, the transition is
    /// validated against the supervisor state machine (spec §4.2) before
    /// committing; an invalid transition is rejected and the table is left
    /// untouched.
    pub fn update(
        &self,
        id: &ProcessId,
        mutator: impl FnOnce(&ProcessRecord) -> ProcessRecord,
    ) -> Result<Option<ProcessRecord>, FleetError> {
        let mut guard = self.records.write();
        let Some(current) = guard.get(id.as_str()) else {
            return Ok(None);
        };
        let next = mutator(current);
        if next.status != current.status && !current.status.can_transition_to(next.status) {
            return Err(FleetError::new(
                ErrorKind::Conflict,
                format!("invalid transition {:?} -> {:?}", current.status, next.status),
            ));
        }
        guard.insert(id.as_str().to_string(), next.clone());
        Ok(Some(next))
    }

    pub fn remove(&self, id: &ProcessId) -> Option<ProcessRecord> {
        self.records.write().remove(id.as_str())
    }

    /// Appends one line to a record's log ring buffer without going through
    /// `update`'s transition check — log capture never changes `status`
    /// (spec §4.2 "Log capture").
    pub fn push_log(&self, id: &ProcessId, stream: LogStream, text: String, now_ms: u64) -> Option<LogEntry> {
        let mut guard = self.records.write();
        let record = guard.get_mut(id.as_str())?;
        let log_id = record.logs.push(stream, text.clone(), now_ms);
        Some(LogEntry {
            id: log_id,
            timestamp_ms: now_ms,
            stream,
            text,
        })
    }

    /// Snapshot of a record's logs (spec §4.2 `getLogs`).
    pub fn get_logs(
        &self,
        id: &ProcessId,
        stream: Option<LogStream>,
        since_id: Option<u64>,
        limit: Option<usize>,
    ) -> Option<Vec<LogEntry>> {
        self.records
            .read()
            .get(id.as_str())
            .map(|r| r.logs.snapshot(stream, since_id, limit))
    }

    pub fn count(&self, filter: &ProcessFilter) -> usize {
        self.records.read().values().filter(|r| filter.matches(r)).count()
    }

    pub fn query(&self, filter: &ProcessFilter, sort: Option<Sort>, page: Page) -> Vec<ProcessRecord> {
        let mut matched: Vec<ProcessRecord> = self
            .records
            .read()
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        if let Some(sort) = sort {
            matched.sort_by(|a, b| {
                let ord = match sort.key {
                    SortKey::StartTime => a.start_time_ms.cmp(&b.start_time_ms),
                    SortKey::Title => a.title.cmp(&b.title),
                    SortKey::Status => format!("{:?}", a.status).cmp(&format!("{:?}", b.status)),
                    SortKey::Priority => a.priority.cmp(&b.priority),
                };
                if sort.order == SortOrder::Desc {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let start = page.offset.min(matched.len());
        let end = match page.limit {
            Some(limit) => (start + limit).min(matched.len()),
            None => matched.len(),
        };
        matched[start..end].to_vec()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
