//! The seam between the retrieval coordinator and a backing vector store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::RecallResult;
use crate::types::{Metadata, Query, SearchResult};

/// Primitive retrieval and write operations offered by a backing store.
///
/// Implementations must be safe for concurrent use; the coordinator fans out
/// to both indices in parallel over a shared reference. Callers cancel by
/// dropping the returned future — implementations must not detach background
/// work that would outlive a call.
#[async_trait]
pub trait VectorSearchStore: Send + Sync {
    /// Search the static knowledge base. Results are tagged
    /// [`Source::Static`](crate::types::Source::Static).
    async fn search_static(&self, query: &Query) -> RecallResult<Vec<SearchResult>>;

    /// Search conversation memory. Results are tagged
    /// [`Source::Conversation`](crate::types::Source::Conversation) and carry
    /// a timestamp when the backend supplied a parseable one.
    async fn search_conversation(&self, query: &Query) -> RecallResult<Vec<SearchResult>>;

    /// Insert one conversation turn, returning the server-assigned id.
    ///
    /// The timestamp is supplied by the caller (the coordinator stamps UTC
    /// now); the store must persist it verbatim. The turn becomes searchable
    /// only once the backing store has embedded and indexed it — there is no
    /// read-your-writes guarantee.
    async fn add_conversation_turn(
        &self,
        message: &str,
        speaker: &str,
        timestamp: DateTime<Utc>,
        metadata: &Metadata,
    ) -> RecallResult<String>;

    /// Insert one knowledge-base document, returning the server-assigned id.
    async fn add_knowledge_document(
        &self,
        title: &str,
        content: &str,
        metadata: &Metadata,
    ) -> RecallResult<String>;

    /// Delete all conversation records older than `max_age`, returning how
    /// many were removed.
    async fn prune_old_conversations(&self, max_age: Duration) -> RecallResult<usize>;

    /// Lightweight connectivity probe.
    async fn health_check(&self) -> RecallResult<()>;

    /// Release transport state. Idempotent.
    async fn close(&self) -> RecallResult<()>;
}
