//! Conversation-aware retrieval for AI agents.
//!
//! Fuses a slow-changing knowledge base with fast-mutating conversation
//! memory: strong semantic matches still dominate, recent conversational
//! context is reliably injected, and older context gracefully fades under
//! temporal decay.
//!
//! # Example
//!
//! ```no_run
//! use agent_recall::{Query, WeaviateRetriever};
//!
//! # async fn example() -> agent_recall::RecallResult<()> {
//! let retriever = WeaviateRetriever::connect("http://localhost:8080", None, None, None)?;
//!
//! retriever
//!     .add_conversation_turn("let's use postgres for the queue", "user", &Default::default())
//!     .await?;
//!
//! let results = retriever.search_hybrid(&Query::new("queue backend")).await?;
//! for result in results {
//!     println!("{:.3}  {}", result.score, result.text);
//! }
//! retriever.close().await?;
//! # Ok(())
//! # }
//! ```

mod retriever;

pub use retriever::{AgentRecallRetriever, RetrieverStats, WeaviateRetriever};

// Re-export the crate surface callers need alongside the coordinator.
pub use agent_recall_core::{
    IndexConfig, MergeAlgorithm, MergeConfig, Metadata, Query, RecallConfig, RecallError,
    RecallResult, SearchResult, Source, TimeRange, VectorSearchStore,
};
pub use agent_recall_weaviate::{WeaviateClient, WeaviateConfig};
