// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process record, log ring buffer, and the supervisor state machine
//! (spec §3.1, §4.2).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

crate::define_id! {
    /// Unique identifier for a spawned child process.
    pub struct ProcessId;
}

/// Default capacity of a process's log ring buffer (entries, not bytes —
/// this spec picks entries over byte-based capacity; see SPEC_FULL §9).
pub const LOG_BUFFER_SIZE: usize = 1000;

/// Largest chunk a single stdout/stderr read will buffer before treating
/// it as a one-off entry, used when a line exceeds this many bytes.
pub const MAX_LOG_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl ProcessStatus {
    /// The state machine in spec §4.2. Returns true iff `self -> next` is an
    /// allowed edge.
    pub fn can_transition_to(self, next: ProcessStatus) -> bool {
        use ProcessStatus::*;
        matches!(
            (self, next),
            (Starting, Running)
                | (Starting, Failed)
                | (Running, Stopping)
                | (Running, Stopped)
                | (Running, Failed)
                | (Stopping, Stopped)
                | (Stopping, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessStatus::Stopped | ProcessStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    Stdout,
    Stderr,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp_ms: u64,
    pub stream: LogStream,
    pub text: String,
}

/// Bounded FIFO that drops its oldest element on overflow (spec GLOSSARY:
/// Ring buffer). Entries carry a monotonically increasing `id` so
/// `getLogs(sinceId)` can resume a stream.
#[derive(Debug, Clone, Default)]
pub struct LogRingBuffer {
    capacity: usize,
    entries: VecDeque<LogEntry>,
    next_id: u64,
}

impl LogRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.min(4096)),
            next_id: 0,
        }
    }

    /// Push a line, timestamping it with the caller-provided epoch ms.
    /// Returns the assigned entry id.
    pub fn push(&mut self, stream: LogStream, text: String, timestamp_ms: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            id,
            timestamp_ms,
            stream,
            text,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot matching the filters in spec §4.2 `getLogs`.
    pub fn snapshot(
        &self,
        stream: Option<LogStream>,
        since_id: Option<u64>,
        limit: Option<usize>,
    ) -> Vec<LogEntry> {
        let mut out: Vec<LogEntry> = self
            .entries
            .iter()
            .filter(|e| match stream {
                Some(s) => e.stream == s,
                None => true,
            })
            .filter(|e| match since_id {
                Some(since) => e.id > since,
                None => true,
            })
            .cloned()
            .collect();
        if let Some(limit) = limit {
            if out.len() > limit {
                let start = out.len() - limit;
                out = out.split_off(start);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub id: ProcessId,
    pub title: String,
    pub command: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<String>,
    pub status: ProcessStatus,
    pub start_time_ms: u64,
    pub end_time_ms: Option<u64>,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub priority: u8,
    #[serde(skip)]
    pub logs: LogRingBuffer,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ProcessRecord {
    pub fn new(id: ProcessId, title: String, command: Vec<String>, priority: u8, now_ms: u64) -> Self {
        Self {
            id,
            title,
            command,
            env: HashMap::new(),
            cwd: None,
            status: ProcessStatus::Starting,
            start_time_ms: now_ms,
            end_time_ms: None,
            exit_code: None,
            signal: None,
            priority: priority.clamp(1, 10),
            logs: LogRingBuffer::new(LOG_BUFFER_SIZE),
            metadata: HashMap::new(),
        }
    }

    /// Invariant (spec §8): `end_time` is defined iff status is terminal.
    pub fn end_time_matches_status(&self) -> bool {
        self.status.is_terminal() == self.end_time_ms.is_some()
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
