//! The retrieval coordinator: parallel fan-out over the two indices,
//! partial-failure tolerance, and an atomically swappable fusion config.

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use agent_recall_core::{
    IndexConfig, MergeAlgorithm, MergeConfig, Metadata, Query, RecallError, RecallResult,
    ResultMerger, SearchResult, VectorSearchStore,
};
use agent_recall_weaviate::{WeaviateClient, WeaviateConfig};

/// The coordinator backed by the default Weaviate adapter.
pub type WeaviateRetriever = AgentRecallRetriever<WeaviateClient>;

/// Snapshot of the coordinator's runtime state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieverStats {
    pub closed: bool,
    pub algorithm: MergeAlgorithm,
    pub static_weight: f64,
    pub conversation_weight: f64,
    pub temporal_decay_enabled: bool,
    pub half_life_minutes: f64,
    pub static_index: String,
    pub conversation_index: String,
}

struct RetrieverState {
    merger: ResultMerger,
    closed: bool,
}

/// Long-lived retrieval coordinator over a backing store.
///
/// One instance per configured backing store; safe for concurrent use by many
/// callers. Searches and writes take a read hold on the config cell and so
/// run in parallel; [`update_config`](Self::update_config) and
/// [`close`](Self::close) take the write hold, which waits for in-flight
/// operations and publishes atomically — every search observes either the
/// old or the new config in full.
pub struct AgentRecallRetriever<S> {
    store: S,
    index: IndexConfig,
    state: RwLock<RetrieverState>,
}

impl WeaviateRetriever {
    /// Connect to a Weaviate-compatible store.
    ///
    /// `merge` and `index` fall back to defaults when not given. No I/O is
    /// performed; use [`health_check`](Self::health_check) to probe the
    /// endpoint.
    pub fn connect(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        merge: Option<MergeConfig>,
        index: Option<IndexConfig>,
    ) -> RecallResult<Self> {
        let index = index.unwrap_or_default();
        let client = WeaviateClient::new(WeaviateConfig::new(endpoint, api_key), index.clone())?;
        Self::new(client, merge, index)
    }
}

impl<S: VectorSearchStore> AgentRecallRetriever<S> {
    /// Create a coordinator over an arbitrary backing store.
    pub fn new(store: S, merge: Option<MergeConfig>, index: IndexConfig) -> RecallResult<Self> {
        let merger = ResultMerger::new(merge.unwrap_or_default())?;
        index.validate()?;

        Ok(Self {
            store,
            index,
            state: RwLock::new(RetrieverState {
                merger,
                closed: false,
            }),
        })
    }

    /// Search both indices in parallel and fuse the results.
    ///
    /// Partial-failure policy: if exactly one sub-search fails it is replaced
    /// by an empty result set and fusion proceeds (an agent degrades
    /// gracefully when one index is briefly unavailable); if both fail, a
    /// composite error names both causes. Dropping the returned future aborts
    /// both sub-searches — no background work outlives the call.
    #[instrument(skip(self, query), fields(limit = query.limit))]
    pub async fn search_hybrid(&self, query: &Query) -> RecallResult<Vec<SearchResult>> {
        let state = self.state.read().await;
        if state.closed {
            return Err(RecallError::Closed);
        }

        let (static_outcome, conversation_outcome) = tokio::join!(
            self.store.search_static(query),
            self.store.search_conversation(query),
        );

        let (static_results, conversation_results) = match (static_outcome, conversation_outcome) {
            (Err(static_error), Err(conversation_error)) => {
                return Err(RecallError::BothSearchesFailed {
                    static_error: Box::new(static_error),
                    conversation_error: Box::new(conversation_error),
                });
            }
            (Err(error), Ok(conversation_results)) => {
                warn!(%error, "static search failed, serving conversation memory only");
                (Vec::new(), conversation_results)
            }
            (Ok(static_results), Err(error)) => {
                warn!(%error, "conversation search failed, serving knowledge base only");
                (static_results, Vec::new())
            }
            (Ok(static_results), Ok(conversation_results)) => {
                (static_results, conversation_results)
            }
        };

        let merged = state
            .merger
            .merge(static_results, conversation_results, Utc::now(), query.limit);
        debug!(result_count = merged.len(), "hybrid search complete");
        Ok(merged)
    }

    /// [`search_hybrid`](Self::search_hybrid) bounded by a caller deadline.
    ///
    /// The effective deadline is the earlier of this and the adapter's
    /// per-request timeout. On expiry both sub-searches are aborted, partial
    /// results are discarded, and the call reports cancellation.
    pub async fn search_hybrid_with_deadline(
        &self,
        query: &Query,
        deadline: std::time::Duration,
    ) -> RecallResult<Vec<SearchResult>> {
        match tokio::time::timeout(deadline, self.search_hybrid(query)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RecallError::Cancelled),
        }
    }

    /// Search only the static knowledge base.
    pub async fn search_static(&self, query: &Query) -> RecallResult<Vec<SearchResult>> {
        let state = self.state.read().await;
        if state.closed {
            return Err(RecallError::Closed);
        }
        self.store.search_static(query).await
    }

    /// Search only conversation memory.
    ///
    /// Temporal decay is applied here too, so the returned scores are
    /// directly comparable with the hybrid path.
    pub async fn search_conversation(&self, query: &Query) -> RecallResult<Vec<SearchResult>> {
        let state = self.state.read().await;
        if state.closed {
            return Err(RecallError::Closed);
        }
        let results = self.store.search_conversation(query).await?;
        Ok(state.merger.decay().apply_to_results(results, Utc::now()))
    }

    /// Record a conversation turn, stamped with the current UTC time.
    ///
    /// The turn becomes searchable once the backing store has embedded and
    /// indexed it; there is no read-your-writes guarantee.
    pub async fn add_conversation_turn(
        &self,
        message: &str,
        speaker: &str,
        metadata: &Metadata,
    ) -> RecallResult<String> {
        let state = self.state.read().await;
        if state.closed {
            return Err(RecallError::Closed);
        }
        self.store
            .add_conversation_turn(message, speaker, Utc::now(), metadata)
            .await
    }

    /// Add a document to the static knowledge base.
    pub async fn add_knowledge_document(
        &self,
        title: &str,
        content: &str,
        metadata: &Metadata,
    ) -> RecallResult<String> {
        let state = self.state.read().await;
        if state.closed {
            return Err(RecallError::Closed);
        }
        self.store
            .add_knowledge_document(title, content, metadata)
            .await
    }

    /// Delete conversation records older than `max_age`; returns how many
    /// the store reports deleted.
    pub async fn prune_old_conversations(&self, max_age: Duration) -> RecallResult<usize> {
        let state = self.state.read().await;
        if state.closed {
            return Err(RecallError::Closed);
        }
        self.store.prune_old_conversations(max_age).await
    }

    /// Validate and atomically swap the fusion configuration.
    ///
    /// The decay parameters are rebuilt together with the merger, so
    /// subsequent searches observe the new config in full. An invalid config
    /// is rejected before the write hold is taken and changes nothing.
    pub async fn update_config(&self, config: MergeConfig) -> RecallResult<()> {
        let merger = ResultMerger::new(config)?;
        let mut state = self.state.write().await;
        if state.closed {
            return Err(RecallError::Closed);
        }
        state.merger = merger;
        debug!("fusion config updated");
        Ok(())
    }

    /// Current fusion configuration.
    pub async fn config(&self) -> MergeConfig {
        self.state.read().await.merger.config().clone()
    }

    /// Index configuration (immutable after construction).
    pub fn index_config(&self) -> &IndexConfig {
        &self.index
    }

    /// Runtime statistics snapshot.
    pub async fn stats(&self) -> RetrieverStats {
        let state = self.state.read().await;
        let config = state.merger.config();
        RetrieverStats {
            closed: state.closed,
            algorithm: config.algorithm,
            static_weight: config.static_weight,
            conversation_weight: config.conversation_weight,
            temporal_decay_enabled: config.temporal_decay_enabled,
            half_life_minutes: config.half_life_minutes,
            static_index: self.index.static_index_name.clone(),
            conversation_index: self.index.conversation_index_name.clone(),
        }
    }

    /// Verify the coordinator and its backing store are healthy.
    pub async fn health_check(&self) -> RecallResult<()> {
        let state = self.state.read().await;
        if state.closed {
            return Err(RecallError::Closed);
        }
        self.store.health_check().await
    }

    /// Enter the terminal closed state and release the store's transport.
    ///
    /// Idempotent. In-flight operations are not forcibly cancelled; every
    /// operation started after this returns observes the closed error without
    /// contacting the store.
    pub async fn close(&self) -> RecallResult<()> {
        let mut state = self.state.write().await;
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        self.store.close().await
    }

    /// Whether [`close`](Self::close) has been called.
    pub async fn is_closed(&self) -> bool {
        self.state.read().await.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_recall_core::stubs::InMemoryVectorStore;

    #[tokio::test]
    async fn test_stats_snapshot_reflects_config() {
        let retriever =
            AgentRecallRetriever::new(InMemoryVectorStore::new(), None, IndexConfig::default())
                .unwrap();

        let stats = retriever.stats().await;
        assert!(!stats.closed);
        assert_eq!(stats.algorithm, MergeAlgorithm::Weighted);
        assert_eq!(stats.static_weight, 0.6);
        assert_eq!(stats.static_index, "KnowledgeBase");
        assert_eq!(stats.conversation_index, "Conversation");
    }

    #[tokio::test]
    async fn test_constructor_rejects_invalid_config() {
        let bad = MergeConfig {
            conversation_weight: 7.0,
            ..MergeConfig::default()
        };
        let result =
            AgentRecallRetriever::new(InMemoryVectorStore::new(), Some(bad), IndexConfig::default());
        assert!(matches!(result, Err(RecallError::InvalidWeight)));
    }

    #[test]
    fn test_connect_rejects_empty_endpoint() {
        let result = WeaviateRetriever::connect("", None, None, None);
        assert!(matches!(result, Err(RecallError::Config(_))));
    }

    #[tokio::test]
    async fn test_stats_serialize_camel_case() {
        let retriever =
            AgentRecallRetriever::new(InMemoryVectorStore::new(), None, IndexConfig::default())
                .unwrap();
        let json = serde_json::to_value(retriever.stats().await).unwrap();

        assert_eq!(json["algorithm"], "weighted");
        assert_eq!(json["staticWeight"], 0.6);
        assert_eq!(json["halfLifeMinutes"], 30.0);
        assert_eq!(json["staticIndex"], "KnowledgeBase");
        assert_eq!(json["closed"], false);
    }
}
