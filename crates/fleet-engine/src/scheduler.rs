// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority Scheduler (spec §4.3): a single dispatch worker owns a priority
//! queue of `QueueEntry` and admits work into the supervisor up to
//! `maxConcurrent`. All external calls go through a control channel so the
//! queue itself never needs a lock.

use crate::event_bus::EventBus;
use crate::supervisor::{StopOptions, Supervisor};
use fleet_core::{Clock, Event, FleetError, ProcessId, ProcessStatus, QueueEntry, SpawnSpec};
use fleet_storage::Snapshot;
use std::collections::BinaryHeap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// How often the dispatch loop wakes up to re-check backoff eligibility,
/// absent any other trigger. An approximation of per-entry timers (spec §5
/// "backoff timer expiry") that keeps the worker loop simple.
const BACKOFF_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Queued,
    Running,
}

#[derive(Debug, Clone)]
pub struct SubmitResult {
    pub id: ProcessId,
    pub admission: Admission,
}

#[derive(Debug, Clone, Copy)]
pub struct SubmitOptions {
    pub priority: u8,
    pub immediate: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            priority: 5,
            immediate: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            max_retries: 0,
            backoff_base_ms: 1000,
            backoff_max_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub running: usize,
    pub queued: usize,
    pub paused: bool,
    pub entries: Option<Vec<QueueEntry>>,
}

/// Surfaces a dead worker task instead of panicking the caller (spec §7
/// error taxonomy: library code propagates, it never unwraps a channel).
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler worker is no longer running")]
    WorkerGone,
}

impl From<SchedulerError> for FleetError {
    fn from(_: SchedulerError) -> Self {
        FleetError::new(fleet_core::ErrorKind::Internal, "scheduler worker is no longer running")
    }
}

enum ControlMsg {
    Submit {
        spec: SpawnSpec,
        options: SubmitOptions,
        reply: oneshot::Sender<SubmitResult>,
    },
    Cancel {
        id: ProcessId,
        reply: oneshot::Sender<bool>,
    },
    Pause,
    Resume,
    SetConfig(SchedulerConfig),
    Status {
        include_entries: bool,
        reply: oneshot::Sender<SchedulerStatus>,
    },
}

/// Handle to a running scheduler worker. Cloning shares the same worker.
#[derive(Clone)]
pub struct Scheduler {
    control_tx: mpsc::Sender<ControlMsg>,
}

impl Scheduler {
    /// Spawns the dispatch worker. `snapshot_path`, if given, is where
    /// `queue.json` is written after every mutation and loaded from at
    /// startup (spec §4.3 "Persistence").
    pub fn spawn(
        supervisor: Arc<Supervisor>,
        bus: EventBus,
        clock: Arc<dyn Clock>,
        snapshot_path: Option<PathBuf>,
    ) -> Self {
        let (control_tx, control_rx) = mpsc::channel(256);
        let worker = Worker {
            heap: BinaryHeap::new(),
            running: HashSet::new(),
            last_admitted: std::collections::HashMap::new(),
            paused: false,
            config: SchedulerConfig::default(),
            supervisor,
            clock,
            bus_events: bus.subscribe(),
            snapshot: snapshot_path.map(Snapshot::new),
        };
        tokio::spawn(worker.run(control_rx));
        Self { control_tx }
    }

    pub async fn submit(&self, spec: SpawnSpec, options: SubmitOptions) -> Result<SubmitResult, SchedulerError> {
        let (reply, recv) = oneshot::channel();
        let _ = self.control_tx.send(ControlMsg::Submit { spec, options, reply }).await;
        recv.await.map_err(|_| SchedulerError::WorkerGone)
    }

    pub async fn cancel(&self, id: ProcessId) -> bool {
        let (reply, recv) = oneshot::channel();
        let _ = self.control_tx.send(ControlMsg::Cancel { id, reply }).await;
        recv.await.unwrap_or(false)
    }

    pub async fn pause(&self) {
        let _ = self.control_tx.send(ControlMsg::Pause).await;
    }

    pub async fn resume(&self) {
        let _ = self.control_tx.send(ControlMsg::Resume).await;
    }

    pub async fn set_config(&self, config: SchedulerConfig) {
        let _ = self.control_tx.send(ControlMsg::SetConfig(config)).await;
    }

    pub async fn status(&self, include_entries: bool) -> Result<SchedulerStatus, SchedulerError> {
        let (reply, recv) = oneshot::channel();
        let _ = self.control_tx.send(ControlMsg::Status { include_entries, reply }).await;
        recv.await.map_err(|_| SchedulerError::WorkerGone)
    }
}

struct Worker {
    heap: BinaryHeap<QueueEntry>,
    running: HashSet<String>,
    /// The `QueueEntry` for each currently-running process id, kept so a
    /// retry can be built from it once the exit event arrives.
    last_admitted: std::collections::HashMap<String, QueueEntry>,
    paused: bool,
    config: SchedulerConfig,
    supervisor: Arc<Supervisor>,
    clock: Arc<dyn Clock>,
    bus_events: crate::event_bus::Subscription,
    snapshot: Option<Snapshot<Vec<QueueEntry>>>,
}

impl Worker {
    async fn run(mut self, mut control_rx: mpsc::Receiver<ControlMsg>) {
        self.restore();
        self.dispatch();
        loop {
            tokio::select! {
                msg = control_rx.recv() => {
                    match msg {
                        Some(msg) => self.handle_control(msg),
                        None => break,
                    }
                }
                event = self.bus_events.recv() => {
                    if let Some(Event::ProcessExited { record }) = event {
                        self.handle_exit(record.id.as_str(), record.status, record.exit_code, record.signal);
                    }
                }
                _ = tokio::time::sleep(BACKOFF_POLL_INTERVAL) => {}
            }
            self.dispatch();
        }
    }

    fn restore(&mut self) {
        let Some(snapshot) = &self.snapshot else { return };
        match snapshot.load() {
            Ok(Some(entries)) => {
                for entry in entries.into_iter().filter(|e| !e.cancelled) {
                    self.heap.push(entry);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to load queue snapshot, starting empty"),
        }
    }

    fn persist(&self) {
        let Some(snapshot) = &self.snapshot else { return };
        let entries: Vec<QueueEntry> = self.heap.iter().cloned().collect();
        if let Err(e) = snapshot.save(&entries) {
            tracing::warn!(error = %e, "failed to persist queue snapshot");
        }
    }

    fn handle_control(&mut self, msg: ControlMsg) {
        match msg {
            ControlMsg::Submit { spec, options, reply } => {
                let result = self.submit(spec, options);
                let _ = reply.send(result);
            }
            ControlMsg::Cancel { id, reply } => {
                let cancelled = self.cancel(&id);
                let _ = reply.send(cancelled);
            }
            ControlMsg::Pause => {
                self.paused = true;
                self.persist();
            }
            ControlMsg::Resume => {
                self.paused = false;
                self.persist();
            }
            ControlMsg::SetConfig(config) => {
                self.config = config;
                self.persist();
            }
            ControlMsg::Status { include_entries, reply } => {
                let status = SchedulerStatus {
                    running: self.running.len(),
                    queued: self.heap.len(),
                    paused: self.paused,
                    entries: include_entries.then(|| {
                        // Presented in dispatch order (best-next first), not
                        // the heap's internal array order.
                        let mut entries: Vec<QueueEntry> = self.heap.iter().cloned().collect();
                        entries.sort_by(|a, b| b.cmp(a));
                        entries
                    }),
                };
                let _ = reply.send(status);
            }
        }
    }

    fn submit(&mut self, spec: SpawnSpec, options: SubmitOptions) -> SubmitResult {
        let id = ProcessId::new(Uuid::new_v4().to_string());
        let now = self.clock.epoch_ms();
        let entry = QueueEntry::new(id.clone(), spec, options.priority, now);

        if options.immediate && !self.paused && self.running.len() < self.config.max_concurrent {
            self.admit(entry);
            self.persist();
            return SubmitResult {
                id,
                admission: Admission::Running,
            };
        }

        self.heap.push(entry);
        self.persist();
        SubmitResult {
            id,
            admission: Admission::Queued,
        }
    }

    fn cancel(&mut self, id: &ProcessId) -> bool {
        let items: Vec<QueueEntry> = self.heap.drain().collect();
        let mut found = false;
        let kept: Vec<QueueEntry> = items
            .into_iter()
            .filter(|e| {
                if !found && e.process_id == *id {
                    found = true;
                    false
                } else {
                    true
                }
            })
            .collect();
        self.heap = kept.into_iter().collect();
        if found {
            self.persist();
        }
        found
    }

    fn handle_exit(&mut self, process_id: &str, status: ProcessStatus, exit_code: Option<i32>, signal: Option<i32>) {
        let Some(entry) = self.take_retry_context(process_id) else {
            return;
        };
        self.running.remove(process_id);

        // A signal-terminated process (crash, or the SIGTERM/SIGKILL sent by
        // `stop`) is not a spawn failure: the child started and ran. Only a
        // process that never started at all (no exit code, no signal) is
        // `SpawnFailed` and retryable on that basis (spec §4.3).
        let spawn_failed = status == ProcessStatus::Failed && exit_code.is_none() && signal.is_none();
        let failed_nonzero = status == ProcessStatus::Failed && exit_code.map(|c| c != 0).unwrap_or(false);
        if (spawn_failed || failed_nonzero) && entry.attempt <= self.config.max_retries {
            let now = self.clock.epoch_ms();
            let backoff = self.config.backoff_base_ms.saturating_mul(1u64 << (entry.attempt.saturating_sub(1)));
            let backoff = backoff.min(self.config.backoff_max_ms);
            let mut retry = entry;
            retry.attempt += 1;
            retry.next_eligible_at_ms = now + backoff;
            self.heap.push(retry);
        }
        self.persist();
    }

    /// Pulls the retry bookkeeping context for a process that just exited.
    /// The running set only tracks ids, so the original `QueueEntry` (spec,
    /// priority, attempt) for a retry comes from the last admitted entry —
    /// kept in `self.last_admitted` until the exit is observed.
    fn take_retry_context(&mut self, process_id: &str) -> Option<QueueEntry> {
        self.last_admitted.remove(process_id)
    }

    fn admit(&mut self, entry: QueueEntry) {
        self.running.insert(entry.process_id.as_str().to_string());
        self.last_admitted.insert(entry.process_id.as_str().to_string(), entry.clone());
        let result = self.supervisor.start(entry.process_id.clone(), entry.spec.clone(), entry.priority);
        if let Err(e) = result {
            tracing::warn!(error = %e, process_id = %entry.process_id, "supervisor rejected admitted entry");
        }
    }

    fn dispatch(&mut self) {
        if self.paused {
            return;
        }
        while self.running.len() < self.config.max_concurrent {
            let Some(entry) = self.pop_best_eligible() else {
                break;
            };
            self.admit(entry);
        }
        self.persist();
    }

    fn pop_best_eligible(&mut self) -> Option<QueueEntry> {
        let now = self.clock.epoch_ms();
        let items: Vec<QueueEntry> = self.heap.drain().collect();
        let mut best_idx: Option<usize> = None;
        for (i, e) in items.iter().enumerate() {
            if e.cancelled || !e.is_eligible(now) {
                continue;
            }
            let is_better = match best_idx {
                None => true,
                Some(b) => e > &items[b],
            };
            if is_better {
                best_idx = Some(i);
            }
        }
        let mut items = items;
        let picked = best_idx.map(|i| items.remove(i));
        self.heap = items.into_iter().collect();
        picked
    }
}

/// `cancel(id)` on a running (not queued) process delegates to the
/// supervisor's `stop` (spec §4.3 "Cancellation").
pub async fn cancel_running(supervisor: &Supervisor, id: &ProcessId) -> Result<(), FleetError> {
    supervisor.stop(id, StopOptions::default()).await.map(|_| ())
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
