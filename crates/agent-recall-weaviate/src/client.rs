//! HTTP adapter for a Weaviate-compatible backing store.
//!
//! # Configuration
//!
//! [`WeaviateConfig::from_env`] reads:
//! - `AGENT_RECALL_ENDPOINT`: store endpoint (default: "http://localhost:8080")
//! - `AGENT_RECALL_API_KEY`: optional bearer token
//! - `AGENT_RECALL_TIMEOUT_SECS`: per-request timeout (default: 30)

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use agent_recall_core::{
    IndexConfig, Metadata, Query, RecallError, RecallResult, SearchResult, Source,
    VectorSearchStore,
};

use crate::parse::{decode_envelope, parse_deleted_count, parse_search_results};
use crate::query::{format_rfc3339, FilterValue, QueryBuilder, WhereFilter};

/// Per-request timeout applied by the pooled HTTP client.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Keyword/vector mix used for knowledge-base searches.
const STATIC_HYBRID_ALPHA: f64 = 0.5;

/// Connection settings for the backing store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaviateConfig {
    /// Base URL, e.g. `http://localhost:8080`
    pub endpoint: String,
    /// Bearer token, sent only when non-empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WeaviateConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("AGENT_RECALL_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            api_key: std::env::var("AGENT_RECALL_API_KEY").ok(),
            timeout_secs: std::env::var("AGENT_RECALL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl WeaviateConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Connection settings for a specific endpoint.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn validate(&self) -> RecallResult<()> {
        if self.endpoint.is_empty() {
            return Err(RecallError::Config("endpoint cannot be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(RecallError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// GraphQL/REST client for the two agent-recall collections.
///
/// Owns a connection-pooled [`reqwest::Client`] with a fixed request-level
/// timeout. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct WeaviateClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    index: IndexConfig,
}

impl WeaviateClient {
    /// Create a client. Fails on invalid connection settings.
    pub fn new(config: WeaviateConfig, index: IndexConfig) -> RecallResult<Self> {
        config.validate()?;
        index.validate()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RecallError::Config(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.filter(|key| !key.is_empty()),
            index,
        })
    }

    pub fn index_config(&self) -> &IndexConfig {
        &self.index
    }

    /// Hybrid search over the knowledge base; results are tagged `static`.
    #[instrument(skip(self, query), fields(limit = query.limit))]
    pub async fn search_static(&self, query: &Query) -> RecallResult<Vec<SearchResult>> {
        let builder = QueryBuilder::new(&self.index.static_index_name, query.limit);
        let graphql = builder.hybrid_query(
            &query.text,
            query.vector.as_deref().unwrap_or(&[]),
            STATIC_HYBRID_ALPHA,
        );

        let data = self.execute_graphql(&graphql).await?;
        parse_search_results(
            &data,
            &["Get", self.index.static_index_name.as_str()],
            Source::Static,
            query.include_meta,
        )
    }

    /// Vector search over conversation memory with an optional time floor;
    /// results are tagged `conversation` and carry parsed timestamps.
    #[instrument(skip(self, query), fields(limit = query.limit))]
    pub async fn search_conversation(&self, query: &Query) -> RecallResult<Vec<SearchResult>> {
        let builder = QueryBuilder::new(&self.index.conversation_index_name, query.limit);
        let since = query.time_range.as_ref().map(|range| range.since);
        let graphql = builder.conversation_query(query.vector.as_deref().unwrap_or(&[]), since);

        let data = self.execute_graphql(&graphql).await?;
        parse_search_results(
            &data,
            &["Get", self.index.conversation_index_name.as_str()],
            Source::Conversation,
            query.include_meta,
        )
    }

    /// Insert a conversation turn with the supplied timestamp.
    pub async fn add_conversation_turn(
        &self,
        message: &str,
        speaker: &str,
        timestamp: DateTime<Utc>,
        metadata: &Metadata,
    ) -> RecallResult<String> {
        let mut properties = serde_json::Map::new();
        properties.insert("message".to_string(), json!(message));
        properties.insert("speaker".to_string(), json!(speaker));
        properties.insert("timestamp".to_string(), json!(format_rfc3339(timestamp)));
        for (key, value) in metadata {
            properties.insert(key.clone(), value.clone());
        }

        self.create_object(json!({
            "class": self.index.conversation_index_name,
            "properties": properties,
        }))
        .await
    }

    /// Insert a knowledge-base document, stamping `updatedAt`.
    pub async fn add_knowledge_document(
        &self,
        title: &str,
        content: &str,
        metadata: &Metadata,
    ) -> RecallResult<String> {
        let mut properties = serde_json::Map::new();
        properties.insert("title".to_string(), json!(title));
        properties.insert("content".to_string(), json!(content));
        properties.insert("updatedAt".to_string(), json!(format_rfc3339(Utc::now())));
        for (key, value) in metadata {
            properties.insert(key.clone(), value.clone());
        }

        self.create_object(json!({
            "class": self.index.static_index_name,
            "properties": properties,
        }))
        .await
    }

    /// Batch-delete conversation records older than `max_age`, returning the
    /// number of objects the store reports deleted.
    #[instrument(skip(self))]
    pub async fn prune_old_conversations(&self, max_age: chrono::Duration) -> RecallResult<usize> {
        let cutoff = Utc::now() - max_age;
        let filter = WhereFilter::leaf(
            "LessThan",
            ["timestamp"],
            FilterValue::Text(format_rfc3339(cutoff)),
        );

        let mutation =
            QueryBuilder::new(&self.index.conversation_index_name, 0).batch_delete_query(&filter);
        let data = self.execute_graphql(&mutation).await?;
        let deleted = parse_deleted_count(&data)?;

        debug!(deleted, "pruned old conversation records");
        Ok(deleted)
    }

    /// Lightweight meta query verifying connectivity.
    pub async fn health_check(&self) -> RecallResult<()> {
        self.execute_graphql("{Meta{hostname}}").await?;
        Ok(())
    }

    /// Release transport state. Idempotent; the connection pool itself is
    /// dropped with the last clone of the client.
    pub async fn close(&self) -> RecallResult<()> {
        Ok(())
    }

    async fn execute_graphql(&self, graphql: &str) -> RecallResult<Value> {
        let url = format!("{}/v1/graphql", self.endpoint);
        let mut request = self.http.post(&url).json(&json!({ "query": graphql }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecallError::Transport(format!("HTTP {}: {}", status, body)));
        }

        let body = response.bytes().await.map_err(transport)?;
        decode_envelope(&body)
    }

    async fn create_object(&self, object: Value) -> RecallResult<String> {
        let url = format!("{}/v1/objects", self.endpoint);
        let mut request = self.http.post(&url).json(&object);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecallError::Transport(format!("HTTP {}: {}", status, body)));
        }

        #[derive(Deserialize)]
        struct Created {
            id: String,
        }
        let created: Created = response
            .json()
            .await
            .map_err(|e| RecallError::parse("id", format!("no id in response: {}", e)))?;
        Ok(created.id)
    }
}

fn transport(err: reqwest::Error) -> RecallError {
    RecallError::Transport(err.to_string())
}

#[async_trait]
impl VectorSearchStore for WeaviateClient {
    async fn search_static(&self, query: &Query) -> RecallResult<Vec<SearchResult>> {
        WeaviateClient::search_static(self, query).await
    }

    async fn search_conversation(&self, query: &Query) -> RecallResult<Vec<SearchResult>> {
        WeaviateClient::search_conversation(self, query).await
    }

    async fn add_conversation_turn(
        &self,
        message: &str,
        speaker: &str,
        timestamp: DateTime<Utc>,
        metadata: &Metadata,
    ) -> RecallResult<String> {
        WeaviateClient::add_conversation_turn(self, message, speaker, timestamp, metadata).await
    }

    async fn add_knowledge_document(
        &self,
        title: &str,
        content: &str,
        metadata: &Metadata,
    ) -> RecallResult<String> {
        WeaviateClient::add_knowledge_document(self, title, content, metadata).await
    }

    async fn prune_old_conversations(&self, max_age: chrono::Duration) -> RecallResult<usize> {
        WeaviateClient::prune_old_conversations(self, max_age).await
    }

    async fn health_check(&self) -> RecallResult<()> {
        WeaviateClient::health_check(self).await
    }

    async fn close(&self) -> RecallResult<()> {
        WeaviateClient::close(self).await
    }
}
