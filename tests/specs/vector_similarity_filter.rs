// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seed scenario 5 (vector similarity search with a threshold and a type filter).

use fleet_adapters::FakeEmbedder;
use fleet_core::{FakeClock, FragmentKind};
use fleet_daemon::fragment::{CreateFragmentRequest, FragmentStore, SimilarityQuery};
use std::sync::Arc;

#[tokio::test]
async fn similarity_search_ranks_the_relevant_fragment_first_and_the_type_filter_excludes_the_rest() {
    let clock = Arc::new(FakeClock::new(1_700_000_000_000));
    let store = FragmentStore::new(Arc::new(FakeEmbedder), clock);

    let leak = store
        .create(CreateFragmentRequest {
            title: "WebSocket memory leak".to_string(),
            body: "Connections are never released after close".to_string(),
            kind: FragmentKind::Solution,
            ..Default::default()
        })
        .await
        .unwrap();
    let recipe = store
        .create(CreateFragmentRequest {
            title: "Pasta recipe".to_string(),
            body: "Boil water, add salt, cook for nine minutes".to_string(),
            kind: FragmentKind::Note,
            ..Default::default()
        })
        .await
        .unwrap();

    let results = store
        .search_similar(&SimilarityQuery {
            text: "socket leak fix".to_string(),
            limit: 10,
            threshold: 0.2,
            tags: Vec::new(),
        })
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert_eq!(results[0].0.id, leak.id, "the WebSocket leak fragment ranks first");
    let leak_score = results.iter().find(|(f, _)| f.id == leak.id).map(|(_, s)| *s).unwrap();
    let recipe_score = results.iter().find(|(f, _)| f.id == recipe.id).map(|(_, s)| *s);
    if let Some(recipe_score) = recipe_score {
        assert!(leak_score > recipe_score);
    }

    let filtered = store
        .search_advanced(&fleet_daemon::fragment::AdvancedQuery {
            similarity: Some(SimilarityQuery {
                text: "socket leak fix".to_string(),
                limit: 10,
                threshold: 0.2,
                tags: Vec::new(),
            }),
            search: fleet_daemon::fragment::SearchQuery {
                kind: Some(FragmentKind::Solution),
                ..Default::default()
            },
            filter_mode: fleet_daemon::fragment::FilterMode::Post,
        })
        .await
        .unwrap();

    assert!(filtered.fragments.iter().all(|(f, _)| f.id != recipe.id), "the note-type fragment is filtered out entirely");
    assert!(filtered.fragments.iter().any(|(f, _)| f.id == leak.id));
}
