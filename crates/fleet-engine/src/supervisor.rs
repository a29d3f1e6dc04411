// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process Supervisor (spec §4.2): owns the spawn/stop/exit lifecycle of
//! child processes and drives the `ProcessStatus` state machine. Log
//! capture runs on two reader tasks per child; exit is observed by a third
//! task that waits on the child and finalizes the record.

use crate::event_bus::EventBus;
use crate::registry::ProcessRegistry;
use fleet_adapters::{SpawnError, SpawnedChild};
use fleet_core::{Clock, Event, FleetError, LogStream, ProcessId, ProcessRecord, ProcessStatus, SpawnSpec};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, Lines};
use tokio::task::JoinHandle;

/// Default `stop` grace period before escalating to `SIGKILL` (spec §4.2).
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 5000;
/// Bounded drain window for log readers after the child exits (spec §4.2
/// failure model).
const DRAIN_WINDOW: Duration = Duration::from_millis(250);
/// Extra grace given after a force-kill for the exit waiter to observe and
/// finalize the record.
const KILL_GRACE_MS: u64 = 1000;
const STOP_POLL_INTERVAL_MS: u64 = 20;

struct ChildHandle {
    pid: Option<u32>,
}

/// Options for `stop` (spec §4.2).
#[derive(Debug, Clone, Copy, Default)]
pub struct StopOptions {
    pub force: bool,
    pub timeout_ms: Option<u64>,
}

pub struct Supervisor {
    registry: Arc<ProcessRegistry>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    children: Arc<Mutex<HashMap<String, ChildHandle>>>,
}

impl Supervisor {
    pub fn new(registry: Arc<ProcessRegistry>, bus: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            bus,
            clock,
            children: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Inserts a `starting` record under `id` and spawns the child. The id
    /// is supplied by the caller (the scheduler's stable logical id, shared
    /// across retry attempts) rather than minted here. On spawn success the
    /// record transitions to `running`; on failure it transitions to
    /// `failed` and a `SpawnFailed` error is returned.
    pub fn start(&self, id: ProcessId, spec: SpawnSpec, priority: u8) -> Result<ProcessRecord, FleetError> {
        let now = self.clock.epoch_ms();
        let mut record = ProcessRecord::new(id.clone(), spec.title.clone(), spec.command.clone(), priority, now);
        record.env = spec.env.clone();
        record.cwd = spec.cwd.clone();
        self.registry.add(record.clone());
        self.bus.publish(Event::ProcessCreated { record: record.clone() });

        match SpawnedChild::spawn(&spec) {
            Ok(mut child) => {
                let pid = child.pid();
                self.children.lock().insert(id.as_str().to_string(), ChildHandle { pid });

                let stdout = child.take_stdout_lines();
                let stderr = child.take_stderr_lines();
                let stdout_task = stdout.map(|lines| self.spawn_reader(id.clone(), LogStream::Stdout, lines));
                let stderr_task = stderr.map(|lines| self.spawn_reader(id.clone(), LogStream::Stderr, lines));

                let updated = self
                    .registry
                    .update(&id, |r| {
                        let mut next = r.clone();
                        next.status = ProcessStatus::Running;
                        next
                    })?
                    .ok_or_else(|| FleetError::new(fleet_core::ErrorKind::Internal, format!("process {id} vanished from the registry between insert and transition")))?;
                self.bus.publish(Event::ProcessStarted { record: updated.clone() });

                self.spawn_exit_waiter(id, child, stdout_task, stderr_task);
                Ok(updated)
            }
            Err(e) => {
                self.children.lock().remove(id.as_str());
                let now = self.clock.epoch_ms();
                self.registry
                    .push_log(&id, LogStream::System, format!("spawn failed: {e}"), now);
                let failed = self
                    .registry
                    .update(&id, |r| {
                        let mut next = r.clone();
                        next.status = ProcessStatus::Failed;
                        next.end_time_ms = Some(now);
                        next
                    })?
                    .ok_or_else(|| FleetError::new(fleet_core::ErrorKind::Internal, format!("process {id} vanished from the registry between insert and transition")))?;
                self.bus.publish(Event::ProcessExited { record: failed });
                Err(FleetError::new(
                    fleet_core::ErrorKind::SpawnFailed,
                    spawn_error_message(&e),
                ))
            }
        }
    }

    /// Only valid from `running`. Sends `SIGTERM`, waits up to
    /// `timeout_ms` (default 5000, skipped entirely when `force`), then
    /// escalates to `SIGKILL` if the child has not exited.
    pub async fn stop(&self, id: &ProcessId, options: StopOptions) -> Result<ProcessRecord, FleetError> {
        let current = self
            .registry
            .get(id)
            .ok_or_else(|| FleetError::not_found(format!("unknown process {id}")))?;
        if current.status != ProcessStatus::Running {
            return Err(FleetError::precondition("stop is only valid from running"));
        }

        self.registry
            .update(id, |r| {
                let mut next = r.clone();
                next.status = ProcessStatus::Stopping;
                next
            })?;

        let pid = self.children.lock().get(id.as_str()).and_then(|h| h.pid);
        if let Some(pid) = pid {
            let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }

        let timeout_ms = if options.force { 0 } else { options.timeout_ms.unwrap_or(DEFAULT_STOP_TIMEOUT_MS) };
        if self.wait_for_terminal(id, timeout_ms).await {
            return Ok(self.registry.get(id).unwrap_or(current));
        }

        if let Some(pid) = pid {
            let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
        }
        self.wait_for_terminal(id, KILL_GRACE_MS).await;
        Ok(self.registry.get(id).unwrap_or(current))
    }

    pub fn get_logs(
        &self,
        id: &ProcessId,
        stream: Option<LogStream>,
        since_id: Option<u64>,
        limit: Option<usize>,
    ) -> Option<Vec<fleet_core::LogEntry>> {
        self.registry.get_logs(id, stream, since_id, limit)
    }

    async fn wait_for_terminal(&self, id: &ProcessId, budget_ms: u64) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(budget_ms);
        loop {
            match self.registry.get(id) {
                Some(record) if record.status.is_terminal() => return true,
                None => return true,
                _ => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(STOP_POLL_INTERVAL_MS)).await;
        }
    }

    fn spawn_reader<R>(&self, id: ProcessId, stream: LogStream, lines: Lines<R>) -> JoinHandle<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let registry = self.registry.clone();
        let bus = self.bus.clone();
        let clock = self.clock.clone();
        tokio::spawn(drain_lines(lines, registry, bus, clock, id, stream))
    }

    fn spawn_exit_waiter(
        &self,
        id: ProcessId,
        child: SpawnedChild,
        stdout_task: Option<JoinHandle<()>>,
        stderr_task: Option<JoinHandle<()>>,
    ) {
        let registry = self.registry.clone();
        let bus = self.bus.clone();
        let clock = self.clock.clone();
        let children = self.children.clone();
        tokio::spawn(run_exit_waiter(registry, bus, clock, children, id, child, stdout_task, stderr_task));
    }
}

fn spawn_error_message(e: &SpawnError) -> String {
    format!("{e}")
}

async fn drain_lines<R: AsyncBufRead + Unpin>(
    mut lines: Lines<R>,
    registry: Arc<ProcessRegistry>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    id: ProcessId,
    stream: LogStream,
) {
    loop {
        match lines.next_line().await {
            Ok(Some(text)) => {
                let now = clock.epoch_ms();
                if let Some(entry) = registry.push_log(&id, stream, text, now) {
                    bus.publish(Event::ProcessLog {
                        process_id: id.as_str().to_string(),
                        entry,
                    });
                }
            }
            Ok(None) => break,
            Err(e) => {
                let now = clock.epoch_ms();
                registry.push_log(&id, LogStream::System, format!("log stream read error: {e}"), now);
                break;
            }
        }
    }
}

async fn run_exit_waiter(
    registry: Arc<ProcessRegistry>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    children: Arc<Mutex<HashMap<String, ChildHandle>>>,
    id: ProcessId,
    mut child: SpawnedChild,
    stdout_task: Option<JoinHandle<()>>,
    stderr_task: Option<JoinHandle<()>>,
) {
    let status = child.wait().await;

    let _ = tokio::time::timeout(DRAIN_WINDOW, async {
        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        if let Some(task) = stderr_task {
            let _ = task.await;
        }
    })
    .await;

    children.lock().remove(id.as_str());

    let now = clock.epoch_ms();
    let (success, exit_code, signal) = match &status {
        Ok(s) => (s.success(), s.code(), s.signal()),
        Err(_) => (false, None, None),
    };
    let target = if success { ProcessStatus::Stopped } else { ProcessStatus::Failed };

    let updated = registry.update(&id, |r| {
        let mut next = r.clone();
        next.status = target;
        next.end_time_ms = Some(now);
        next.exit_code = exit_code;
        next.signal = signal;
        next
    });

    if let Ok(Some(record)) = updated {
        bus.publish(Event::ProcessExited { record });
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
