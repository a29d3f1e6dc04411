// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seed scenario 4 (cross-reference rewrite and broken-reference detection).

use fleet_core::{FakeClock, Priority};
use fleet_daemon::knowledge::{CreateIssueRequest, KnowledgeStore};
use std::sync::Arc;

#[test]
fn rename_rewrites_every_occurrence_and_clears_broken_refs() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(1_700_000_000_000));
    let store = KnowledgeStore::new(dir.path(), clock).unwrap();

    let issue_1 = store
        .create(
            "ISSUE",
            CreateIssueRequest {
                content: "See [[ISSUE_2]] for details".to_string(),
                priority: Priority::Medium,
                ..Default::default()
            },
        )
        .unwrap();
    let issue_2 = store
        .create(
            "ISSUE",
            CreateIssueRequest {
                content: "The issue being referenced elsewhere".to_string(),
                priority: Priority::Medium,
                ..Default::default()
            },
        )
        .unwrap();
    let issue_3 = store
        .create(
            "ISSUE",
            CreateIssueRequest {
                content: "Related: [[ISSUE_2]] and also [[ISSUE_2]] again".to_string(),
                priority: Priority::Medium,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(issue_2.id.as_str(), "ISSUE_2");

    let broken_before = store.find_broken();
    assert!(broken_before.is_empty(), "ISSUE_2 exists, so referencing it is not yet broken");

    let updated = store.rename("ISSUE_2", issue_3.id.as_str(), false);
    assert_eq!(updated.len(), 2, "issue_1 and issue_3 both referenced ISSUE_2");
    assert!(updated.contains(&issue_1.id.as_str().to_string()));
    assert!(updated.contains(&issue_3.id.as_str().to_string()));

    let reread_1 = store.get(&issue_1.id).unwrap();
    let reread_3 = store.get(&issue_3.id).unwrap();
    assert_eq!(reread_1.content, format!("See [[{}]] for details", issue_3.id.as_str()));
    assert_eq!(
        reread_3.content,
        format!("Related: [[{}]] and also [[{}]] again", issue_3.id.as_str(), issue_3.id.as_str())
    );
    assert!(!reread_1.content.contains("ISSUE_2"));

    let broken_after = store.find_broken();
    assert!(broken_after.is_empty(), "every rewritten reference now points at an existing entry");
}
