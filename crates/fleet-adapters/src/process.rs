// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process adapter: spawns a command with piped stdio and exposes
//! line readers plus graceful/forced termination (spec §4.2).

use fleet_core::SpawnSpec;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("empty command")]
    EmptyCommand,
    #[error("failed to spawn child process: {0}")]
    Io(#[from] std::io::Error),
}

/// A running child process with its stdout/stderr readers split out so the
/// supervisor can hand one reader task per stream.
pub struct SpawnedChild {
    child: Child,
    stdout: Option<Lines<BufReader<ChildStdout>>>,
    stderr: Option<Lines<BufReader<ChildStderr>>>,
}

impl SpawnedChild {
    pub fn spawn(spec: &SpawnSpec) -> Result<Self, SpawnError> {
        let (program, args) = spec
            .command
            .split_first()
            .ok_or(SpawnError::EmptyCommand)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn()?;
        let stdout = child.stdout.take().map(|s| BufReader::new(s).lines());
        let stderr = child.stderr.take().map(|s| BufReader::new(s).lines());

        Ok(Self {
            child,
            stdout,
            stderr,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn take_stdout_lines(&mut self) -> Option<Lines<BufReader<ChildStdout>>> {
        self.stdout.take()
    }

    pub fn take_stderr_lines(&mut self) -> Option<Lines<BufReader<ChildStderr>>> {
        self.stderr.take()
    }

    /// Send `SIGTERM` (gentle first, per spec §4.2 `stop`).
    pub fn terminate(&self) -> std::io::Result<()> {
        self.send_signal(Signal::SIGTERM)
    }

    /// Send `SIGKILL` (force, or after the termination timeout elapses).
    pub fn kill(&self) -> std::io::Result<()> {
        self.send_signal(Signal::SIGKILL)
    }

    fn send_signal(&self, sig: Signal) -> std::io::Result<()> {
        let Some(pid) = self.pid() else {
            return Ok(());
        };
        signal::kill(Pid::from_raw(pid as i32), sig)
            .map_err(|errno| std::io::Error::from_raw_os_error(errno as i32))
    }

    pub async fn wait(&mut self) -> std::io::Result<std::process::ExitStatus> {
        self.child.wait().await
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
