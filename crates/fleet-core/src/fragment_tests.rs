// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn fragment(id: &str, vector: Vec<f32>) -> Fragment {
    Fragment {
        id: FragmentId::new(id),
        title: "t".into(),
        body: "b".into(),
        kind: FragmentKind::Note,
        created_ms: 0,
        updated_ms: 0,
        tags: vec![],
        metadata: std::collections::HashMap::new(),
        related_ids: vec![],
        priority: None,
        status: FragmentStatus::Active,
        vector,
    }
}

#[test]
fn has_dimension_checks_vector_length() {
    let f = fragment("f1", vec![0.0, 1.0, 2.0]);
    assert!(f.has_dimension(3));
    assert!(!f.has_dimension(4));
}

#[test]
fn embeddable_text_combines_title_and_body() {
    let f = fragment("f1", vec![]);
    assert_eq!(f.embeddable_text(), "t\n\nb");
}

#[test]
fn link_id_follows_spec_format() {
    let source = FragmentId::new("abc");
    let target = FragmentId::new("def");
    let id = FragmentLink::mint_id(&source, &target, LinkType::Answers);
    assert_eq!(id.as_str(), "link_abc_def_answers");
}

#[test]
fn self_links_are_rejected() {
    let id = FragmentId::new("abc");
    assert!(FragmentLink::new(id.clone(), id, LinkType::Related, 0).is_none());
}

#[test]
fn distinct_endpoints_produce_a_link() {
    let link = FragmentLink::new(FragmentId::new("a"), FragmentId::new("b"), LinkType::Supersedes, 10).unwrap();
    assert_eq!(link.id.as_str(), "link_a_b_supersedes");
    assert_eq!(link.created_ms, 10);
}
