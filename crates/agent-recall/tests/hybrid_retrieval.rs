//! End-to-end coordinator scenarios against the in-memory stub store.

use std::sync::Arc;

use chrono::{Duration, Utc};

use agent_recall::{
    AgentRecallRetriever, IndexConfig, MergeAlgorithm, MergeConfig, Metadata, Query, RecallError,
    SearchResult, Source, VectorSearchStore,
};
use agent_recall_core::stubs::InMemoryVectorStore;

type StubRetriever = AgentRecallRetriever<InMemoryVectorStore>;

fn retriever_with(store: &InMemoryVectorStore, merge: Option<MergeConfig>) -> StubRetriever {
    AgentRecallRetriever::new(store.clone(), merge, IndexConfig::default()).unwrap()
}

fn doc(id: &str, score: f64) -> SearchResult {
    SearchResult::new(id, score, format!("doc {}", id), Source::Static)
}

fn turn(id: &str, score: f64, age_minutes: i64) -> SearchResult {
    SearchResult::new(id, score, format!("turn {}", id), Source::Conversation)
        .with_timestamp(Utc::now() - Duration::minutes(age_minutes))
}

#[tokio::test]
async fn half_life_tie_break_orders_fresh_context_first() {
    let store = InMemoryVectorStore::new();
    store.set_static_results(vec![doc("A", 0.5)]);
    store.set_conversation_results(vec![turn("B", 0.9, 60), turn("C", 0.8, 0)]);

    let retriever = retriever_with(&store, None);
    let results = retriever.search_hybrid(&Query::new("q")).await.unwrap();

    // Loose tolerances absorb the wall-clock drift between fixture setup and
    // the fusion engine reading "now".
    let order: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(order, ["C", "A", "B"]);
    assert!((results[0].score - 0.32).abs() < 1e-3);
    assert!((results[1].score - 0.30).abs() < 1e-9);
    assert!((results[2].score - 0.09).abs() < 1e-3);
}

#[tokio::test]
async fn identifier_overlap_sums_across_sources() {
    let store = InMemoryVectorStore::new();
    store.set_static_results(vec![doc("X", 1.0)]);
    store.set_conversation_results(vec![turn("X", 1.0, 0)]);

    let retriever = retriever_with(&store, None);
    let results = retriever.search_hybrid(&Query::new("q")).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!((results[0].score - 1.0).abs() < 1e-3);
}

#[tokio::test]
async fn one_failed_sub_search_degrades_gracefully() {
    let store = InMemoryVectorStore::new();
    store.fail_static("connection refused");
    store.set_conversation_results(vec![turn("Y", 0.7, 0)]);

    let retriever = retriever_with(&store, None);
    let results = retriever.search_hybrid(&Query::new("q")).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "Y");
    assert!((results[0].score - 0.28).abs() < 1e-3);
}

#[tokio::test]
async fn both_failed_sub_searches_return_composite_error() {
    let store = InMemoryVectorStore::new();
    store.fail_static("static down");
    store.fail_conversation("conversation down");

    let retriever = retriever_with(&store, None);
    let err = retriever.search_hybrid(&Query::new("q")).await.unwrap_err();

    match err {
        RecallError::BothSearchesFailed {
            static_error,
            conversation_error,
        } => {
            assert!(static_error.to_string().contains("static down"));
            assert!(conversation_error.to_string().contains("conversation down"));
        }
        other => panic!("expected composite error, got {:?}", other),
    }
}

#[tokio::test]
async fn post_close_operations_are_rejected_without_store_access() {
    let store = InMemoryVectorStore::new();
    store.set_static_results(vec![doc("A", 0.5)]);

    let retriever = retriever_with(&store, None);
    let searches_before_close = store.search_count();

    retriever.close().await.unwrap();
    assert!(retriever.is_closed().await);
    assert!(store.is_closed());

    assert!(matches!(
        retriever.search_hybrid(&Query::new("q")).await,
        Err(RecallError::Closed)
    ));
    assert!(matches!(
        retriever
            .add_conversation_turn("m", "user", &Metadata::new())
            .await,
        Err(RecallError::Closed)
    ));
    assert!(matches!(
        retriever.prune_old_conversations(Duration::hours(1)).await,
        Err(RecallError::Closed)
    ));
    assert!(matches!(
        retriever.health_check().await,
        Err(RecallError::Closed)
    ));

    // The store was never contacted after close.
    assert_eq!(store.search_count(), searches_before_close);
    assert!(store.turns().is_empty());

    // Close is idempotent.
    retriever.close().await.unwrap();
    assert!(retriever.stats().await.closed);
}

#[tokio::test]
async fn config_updates_are_observed_atomically() {
    let store = InMemoryVectorStore::new();
    store.set_static_results(vec![doc("A", 0.5)]);
    store.set_conversation_results(vec![turn("B", 0.8, 0)]);

    let pre = MergeConfig {
        temporal_decay_enabled: false,
        ..MergeConfig::default()
    };
    let post = MergeConfig {
        algorithm: MergeAlgorithm::Rrf,
        static_weight: 0.5,
        conversation_weight: 0.5,
        temporal_decay_enabled: false,
        ..MergeConfig::default()
    };

    // Fused scores under each config, for fixed inputs.
    let weighted_scores = vec![0.8 * 0.4, 0.5 * 0.6]; // B, A
    let rrf_scores = vec![0.5 / 60.0, 0.5 / 60.0]; // A, B (both rank 0)

    let retriever = Arc::new(retriever_with(&store, Some(pre)));

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let retriever = Arc::clone(&retriever);
        tasks.push(tokio::spawn(async move {
            retriever.search_hybrid(&Query::new("q")).await.unwrap()
        }));
    }

    {
        let retriever = Arc::clone(&retriever);
        tasks.push(tokio::spawn(async move {
            retriever.update_config(post).await.unwrap();
            retriever.search_hybrid(&Query::new("q")).await.unwrap()
        }));
    }

    for task in tasks {
        let results = task.await.unwrap();
        let scores: Vec<f64> = results.iter().map(|r| r.score).collect();
        let matches_weighted = scores
            .iter()
            .zip(&weighted_scores)
            .all(|(a, b)| (a - b).abs() < 1e-9);
        let matches_rrf = scores
            .iter()
            .zip(&rrf_scores)
            .all(|(a, b)| (a - b).abs() < 1e-9);
        assert!(
            matches_weighted || matches_rrf,
            "search observed a torn config: {:?}",
            scores
        );
    }

    // After the update every search runs the new algorithm.
    assert_eq!(retriever.config().await.algorithm, MergeAlgorithm::Rrf);
}

#[tokio::test]
async fn disabling_decay_makes_age_irrelevant() {
    let store = InMemoryVectorStore::new();
    store.set_conversation_results(vec![turn("old", 0.8, 600), turn("fresh", 0.8, 0)]);

    let config = MergeConfig {
        temporal_decay_enabled: false,
        ..MergeConfig::default()
    };
    let retriever = retriever_with(&store, Some(config));

    let conversation = retriever
        .search_conversation(&Query::new("q"))
        .await
        .unwrap();
    assert!((conversation[0].score - 0.8).abs() < 1e-9);
    assert!((conversation[1].score - 0.8).abs() < 1e-9);

    let hybrid = retriever.search_hybrid(&Query::new("q")).await.unwrap();
    for result in hybrid {
        assert!((result.score - 0.8 * 0.4).abs() < 1e-9);
    }
}

#[tokio::test]
async fn single_source_conversation_search_applies_decay() {
    let store = InMemoryVectorStore::new();
    store.set_conversation_results(vec![turn("B", 0.8, 30)]);

    let retriever = retriever_with(&store, None);
    let results = retriever
        .search_conversation(&Query::new("q"))
        .await
        .unwrap();

    // One half-life: scores comparable to the hybrid path (before weighting).
    assert!((results[0].score - 0.4).abs() < 1e-3);
}

#[tokio::test]
async fn add_conversation_turn_stamps_current_utc_time() {
    let store = InMemoryVectorStore::new();
    let retriever = retriever_with(&store, None);

    let before = Utc::now();
    let id = retriever
        .add_conversation_turn("remember the deadline", "user", &Metadata::new())
        .await
        .unwrap();
    let after = Utc::now();

    assert!(!id.is_empty());
    let turns = store.turns();
    assert_eq!(turns.len(), 1);
    assert!(turns[0].timestamp >= before && turns[0].timestamp <= after);
    assert_eq!(turns[0].speaker, "user");
}

#[tokio::test]
async fn prune_reports_removed_turn_count() {
    let store = InMemoryVectorStore::new();
    let meta = Metadata::new();
    store
        .add_conversation_turn("ancient", "user", Utc::now() - Duration::hours(3), &meta)
        .await
        .unwrap();
    store
        .add_conversation_turn("recent", "user", Utc::now(), &meta)
        .await
        .unwrap();

    let retriever = retriever_with(&store, None);
    let deleted = retriever
        .prune_old_conversations(Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(store.turns().len(), 1);
}

#[tokio::test]
async fn query_limit_truncates_fused_list() {
    let store = InMemoryVectorStore::new();
    store.set_static_results((0..8).map(|i| doc(&format!("s{}", i), 0.9)).collect());
    store.set_conversation_results((0..8).map(|i| turn(&format!("c{}", i), 0.9, 0)).collect());

    let retriever = retriever_with(&store, None);
    let results = retriever
        .search_hybrid(&Query::new("q").with_limit(3))
        .await
        .unwrap();
    assert_eq!(results.len(), 3);
}

#[tokio::test]
async fn update_config_validation_failure_changes_nothing() {
    let store = InMemoryVectorStore::new();
    let retriever = retriever_with(&store, None);

    let bad = MergeConfig {
        min_temporal_weight: 5.0,
        ..MergeConfig::default()
    };
    assert!(matches!(
        retriever.update_config(bad).await,
        Err(RecallError::InvalidMinWeight)
    ));
    assert_eq!(retriever.config().await, MergeConfig::default());
}

#[tokio::test]
async fn health_check_reflects_store_health() {
    let store = InMemoryVectorStore::new();
    let retriever = retriever_with(&store, None);

    retriever.health_check().await.unwrap();

    store.set_unhealthy(true);
    assert!(matches!(
        retriever.health_check().await,
        Err(RecallError::Transport(_))
    ));
}

#[tokio::test]
async fn deadline_expiry_reports_cancellation() {
    let store = InMemoryVectorStore::new();
    store.set_static_results(vec![doc("A", 0.5)]);
    store.set_search_delay(std::time::Duration::from_secs(5));

    let retriever = retriever_with(&store, None);
    let err = retriever
        .search_hybrid_with_deadline(&Query::new("q"), std::time::Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, RecallError::Cancelled));
}
