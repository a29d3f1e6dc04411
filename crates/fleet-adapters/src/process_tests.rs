// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_core::SpawnSpec;
use std::collections::HashMap;
use tokio::io::AsyncBufReadExt;

fn spec(script: &str) -> SpawnSpec {
    SpawnSpec {
        title: "t".into(),
        command: vec!["sh".into(), "-c".into(), script.into()],
        env: HashMap::new(),
        cwd: None,
    }
}

#[tokio::test]
async fn spawn_captures_stdout_lines_in_order() {
    let mut child = SpawnedChild::spawn(&spec("echo one; echo two; echo three")).unwrap();
    let mut lines = child.take_stdout_lines().unwrap();
    let mut out = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        out.push(line);
    }
    child.wait().await.unwrap();
    assert_eq!(out, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn exit_status_reflects_exit_code() {
    let mut child = SpawnedChild::spawn(&spec("exit 7")).unwrap();
    let status = child.wait().await.unwrap();
    assert_eq!(status.code(), Some(7));
}

#[tokio::test]
async fn terminate_sends_sigterm_to_a_running_child() {
    let mut child = SpawnedChild::spawn(&spec("trap 'exit 0' TERM; sleep 30")).unwrap();
    child.terminate().unwrap();
    let status = tokio::time::timeout(std::time::Duration::from_secs(5), child.wait())
        .await
        .unwrap()
        .unwrap();
    assert!(status.success());
}

#[tokio::test]
async fn empty_command_is_rejected_before_spawning() {
    let spec = SpawnSpec {
        title: "t".into(),
        command: vec![],
        env: HashMap::new(),
        cwd: None,
    };
    assert!(matches!(SpawnedChild::spawn(&spec), Err(SpawnError::EmptyCommand)));
}
