//! Core data model: retrieved chunks and search queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Heterogeneous per-record metadata. The shape is always JSON, so values are
/// tagged [`serde_json::Value`] variants rather than an untyped any-map.
pub type Metadata = HashMap<String, Value>;

/// Default result limit applied by [`Query::new`].
pub const DEFAULT_QUERY_LIMIT: usize = 10;

/// Which index a result was retrieved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Slow-changing knowledge base
    Static,
    /// Append-mostly conversation memory
    Conversation,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Static => "static",
            Source::Conversation => "conversation",
        }
    }
}

/// One retrieved chunk.
///
/// Created by the backing-store adapter from a decoded response, re-scored
/// exactly once by the fusion engine, then surfaced to the caller. After
/// fusion the score is non-negative but no longer bounded to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Stable identifier assigned by the backing store
    pub id: String,

    /// Identifier of the containing document
    pub doc_id: String,

    /// Similarity score, replaced by the fused score during merging
    pub score: f64,

    /// Text payload of the chunk
    pub text: String,

    /// Remaining record fields, copied verbatim from the response
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: Metadata,

    /// Index the record came from
    pub source: Source,

    /// Wall-clock time of the conversation turn.
    ///
    /// Present iff `source == Conversation` and the backend supplied a
    /// parseable timestamp. A conversation record without one is retained but
    /// exempt from temporal decay; decay never substitutes "now".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SearchResult {
    /// Create a result with empty metadata and no timestamp.
    pub fn new(id: impl Into<String>, score: f64, text: impl Into<String>, source: Source) -> Self {
        let id = id.into();
        Self {
            doc_id: id.clone(),
            id,
            score,
            text: text.into(),
            metadata: Metadata::new(),
            source,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Half-open time window `[since, until)` restricting conversation search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

/// A search request.
///
/// `limit` must be positive at the public boundary; `limit == 0` is reserved
/// for internal callers and tells the fusion engine to skip truncation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Free-text query
    pub text: String,

    /// Pre-computed dense vector; the retrieval layer never embeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,

    /// Metadata filter map forwarded to the backing store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Metadata>,

    /// Maximum number of fused results to return
    pub limit: usize,

    /// Restricts conversation search only; static search ignores it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,

    /// Whether record metadata should be included in results
    #[serde(default)]
    pub include_meta: bool,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            vector: None,
            filters: None,
            limit: DEFAULT_QUERY_LIMIT,
            time_range: None,
            include_meta: false,
        }
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn with_filters(mut self, filters: Metadata) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_time_range(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.time_range = Some(TimeRange { since, until });
        self
    }

    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_meta = include;
        self
    }
}
