//! In-memory stub implementation of [`VectorSearchStore`].
//!
//! Used by coordinator tests to script search outcomes (including failures)
//! without a running backing store. Clones share state, so a test can keep a
//! handle after moving a clone into the retriever.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{RecallError, RecallResult};
use crate::store::VectorSearchStore;
use crate::types::{Metadata, Query, SearchResult};

/// A conversation turn recorded by the stub.
#[derive(Debug, Clone)]
pub struct StoredTurn {
    pub id: String,
    pub message: String,
    pub speaker: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Metadata,
}

/// A knowledge document recorded by the stub.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub metadata: Metadata,
}

#[derive(Debug, Default)]
struct StubState {
    static_results: Vec<SearchResult>,
    conversation_results: Vec<SearchResult>,
    turns: Vec<StoredTurn>,
    documents: Vec<StoredDocument>,
    static_failure: Option<String>,
    conversation_failure: Option<String>,
    unhealthy: bool,
    closed: bool,
    search_count: usize,
    search_delay: Option<std::time::Duration>,
}

/// Scriptable in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVectorStore {
    inner: Arc<Mutex<StubState>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results returned by subsequent static searches.
    pub fn set_static_results(&self, results: Vec<SearchResult>) {
        self.inner.lock().static_results = results;
    }

    /// Results returned by subsequent conversation searches.
    pub fn set_conversation_results(&self, results: Vec<SearchResult>) {
        self.inner.lock().conversation_results = results;
    }

    /// Make static searches fail with a transport error.
    pub fn fail_static(&self, message: impl Into<String>) {
        self.inner.lock().static_failure = Some(message.into());
    }

    /// Make conversation searches fail with a transport error.
    pub fn fail_conversation(&self, message: impl Into<String>) {
        self.inner.lock().conversation_failure = Some(message.into());
    }

    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.inner.lock().unhealthy = unhealthy;
    }

    /// Delay every search, to exercise cancellation and concurrency paths.
    pub fn set_search_delay(&self, delay: std::time::Duration) {
        self.inner.lock().search_delay = Some(delay);
    }

    async fn pause_if_scripted(&self) {
        let delay = self.inner.lock().search_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn turns(&self) -> Vec<StoredTurn> {
        self.inner.lock().turns.clone()
    }

    pub fn documents(&self) -> Vec<StoredDocument> {
        self.inner.lock().documents.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Total searches served, across both indices.
    pub fn search_count(&self) -> usize {
        self.inner.lock().search_count
    }
}

#[async_trait]
impl VectorSearchStore for InMemoryVectorStore {
    async fn search_static(&self, query: &Query) -> RecallResult<Vec<SearchResult>> {
        self.pause_if_scripted().await;
        let mut state = self.inner.lock();
        state.search_count += 1;
        if let Some(message) = &state.static_failure {
            return Err(RecallError::Transport(message.clone()));
        }
        let mut results = state.static_results.clone();
        if query.limit > 0 {
            results.truncate(query.limit);
        }
        Ok(results)
    }

    async fn search_conversation(&self, query: &Query) -> RecallResult<Vec<SearchResult>> {
        self.pause_if_scripted().await;
        let mut state = self.inner.lock();
        state.search_count += 1;
        if let Some(message) = &state.conversation_failure {
            return Err(RecallError::Transport(message.clone()));
        }
        let mut results = state.conversation_results.clone();
        if let Some(range) = &query.time_range {
            results.retain(|r| match r.timestamp {
                Some(ts) => ts >= range.since && ts < range.until,
                None => true,
            });
        }
        if query.limit > 0 {
            results.truncate(query.limit);
        }
        Ok(results)
    }

    async fn add_conversation_turn(
        &self,
        message: &str,
        speaker: &str,
        timestamp: DateTime<Utc>,
        metadata: &Metadata,
    ) -> RecallResult<String> {
        let id = Uuid::new_v4().to_string();
        self.inner.lock().turns.push(StoredTurn {
            id: id.clone(),
            message: message.to_string(),
            speaker: speaker.to_string(),
            timestamp,
            metadata: metadata.clone(),
        });
        Ok(id)
    }

    async fn add_knowledge_document(
        &self,
        title: &str,
        content: &str,
        metadata: &Metadata,
    ) -> RecallResult<String> {
        let id = Uuid::new_v4().to_string();
        self.inner.lock().documents.push(StoredDocument {
            id: id.clone(),
            title: title.to_string(),
            content: content.to_string(),
            metadata: metadata.clone(),
        });
        Ok(id)
    }

    async fn prune_old_conversations(&self, max_age: Duration) -> RecallResult<usize> {
        let cutoff = Utc::now() - max_age;
        let mut state = self.inner.lock();
        let before = state.turns.len();
        state.turns.retain(|turn| turn.timestamp >= cutoff);
        Ok(before - state.turns.len())
    }

    async fn health_check(&self) -> RecallResult<()> {
        if self.inner.lock().unhealthy {
            return Err(RecallError::Transport("health check failed".into()));
        }
        Ok(())
    }

    async fn close(&self) -> RecallResult<()> {
        self.inner.lock().closed = true;
        Ok(())
    }
}
