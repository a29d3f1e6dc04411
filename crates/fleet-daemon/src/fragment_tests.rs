// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fleet_adapters::FakeEmbedder;
use fleet_core::FakeClock;

fn store() -> FragmentStore {
    FragmentStore::new(Arc::new(FakeEmbedder), Arc::new(FakeClock::new(1_700_000_000_000)))
}

fn req(title: &str, body: &str) -> CreateFragmentRequest {
    CreateFragmentRequest {
        title: title.into(),
        body: body.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_embeds_and_assigns_matching_dimension() {
    let store = store();
    let fragment = store.create(req("title", "body")).await.unwrap();
    assert!(fragment.has_dimension(fleet_adapters::FAKE_EMBED_DIMENSION));
}

#[tokio::test]
async fn update_re_embeds_only_when_title_or_body_changes() {
    let store = store();
    let fragment = store.create(req("title", "body")).await.unwrap();
    let original_vector = fragment.vector.clone();

    let same_text = store
        .update(&fragment.id, UpdateFragmentPatch { tags: Some(vec!["x".into()]), ..Default::default() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(same_text.vector, original_vector);

    let re_embedded = store
        .update(&fragment.id, UpdateFragmentPatch { body: Some("a new body".into()), ..Default::default() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(re_embedded.vector.len(), original_vector.len());
}

#[tokio::test]
async fn delete_then_get_returns_none() {
    let store = store();
    let fragment = store.create(req("a", "b")).await.unwrap();
    assert!(store.delete(&fragment.id));
    assert!(store.get(&fragment.id).is_none());
}

#[tokio::test]
async fn search_applies_tag_and_full_text_filters() {
    let store = store();
    store.create(req("alpha", "contains needle")).await.unwrap();
    store
        .create(CreateFragmentRequest { tags: vec!["keep".into()], ..req("beta", "no match here") })
        .await
        .unwrap();

    let results = store
        .search(&SearchQuery { full_text: Some("NEEDLE".into()), ..Default::default() })
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "alpha");
}

#[tokio::test]
async fn search_similar_respects_threshold_and_limit() {
    let store = store();
    store.create(req("one", "body one")).await.unwrap();
    store.create(req("two", "body two")).await.unwrap();

    let results = store
        .search_similar(&SimilarityQuery { text: "body one".into(), limit: 1, threshold: 0.0, tags: Vec::new() })
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn search_advanced_downgrades_pre_to_post_and_reports_it() {
    let store = store();
    store.create(req("alpha", "needle here")).await.unwrap();

    let result = store
        .search_advanced(&AdvancedQuery {
            similarity: Some(SimilarityQuery { text: "needle here".into(), limit: 5, threshold: 0.0, tags: Vec::new() }),
            search: SearchQuery::default(),
            filter_mode: FilterMode::Pre,
        })
        .await
        .unwrap();
    assert_eq!(result.strategy_used, FilterMode::Post);
    assert_eq!(result.fragments.len(), 1);
}

#[tokio::test]
async fn create_link_rejects_a_self_loop() {
    let store = store();
    let fragment = store.create(req("a", "b")).await.unwrap();
    assert!(store.create_link(fragment.id.clone(), fragment.id.clone(), LinkType::Related, None).is_none());
}

#[tokio::test]
async fn query_links_filters_by_direction() {
    let store = store();
    let a = store.create(req("a", "a")).await.unwrap();
    let b = store.create(req("b", "b")).await.unwrap();
    store.create_link(a.id.clone(), b.id.clone(), LinkType::References, None).unwrap();

    let outgoing = store.get_links_for_fragment(&a.id, LinkDirection::Outgoing);
    let incoming = store.get_links_for_fragment(&a.id, LinkDirection::Incoming);
    assert_eq!(outgoing.len(), 1);
    assert!(incoming.is_empty());
}

#[tokio::test]
async fn traverse_detects_a_cycle_without_aborting() {
    let store = store();
    let a = store.create(req("a", "a")).await.unwrap();
    let b = store.create(req("b", "b")).await.unwrap();
    let c = store.create(req("c", "c")).await.unwrap();
    store.create_link(a.id.clone(), b.id.clone(), LinkType::Related, None).unwrap();
    store.create_link(b.id.clone(), c.id.clone(), LinkType::Related, None).unwrap();
    store.create_link(c.id.clone(), a.id.clone(), LinkType::Related, None).unwrap();

    let result = store.traverse(&a.id, 5, None, LinkDirection::Outgoing, false);
    assert_eq!(result.total_nodes, 3);
    assert!(result.cycles_detected >= 1);
}

#[tokio::test]
async fn integrity_report_is_healthy_with_no_orphans_or_duplicates() {
    let store = store();
    let a = store.create(req("a", "a")).await.unwrap();
    let b = store.create(req("b", "b")).await.unwrap();
    store.create_link(a.id.clone(), b.id.clone(), LinkType::Related, None).unwrap();

    let report = store.integrity_report();
    assert!(report.is_healthy);
}

#[tokio::test]
async fn find_orphaned_flags_links_to_a_deleted_fragment() {
    let store = store();
    let a = store.create(req("a", "a")).await.unwrap();
    let b = store.create(req("b", "b")).await.unwrap();
    store.create_link(a.id.clone(), b.id.clone(), LinkType::Related, None).unwrap();
    store.delete(&b.id);

    let orphaned = store.find_orphaned();
    assert_eq!(orphaned.len(), 1);
    assert!(!orphaned[0].target_exists);
}
