//! Agent Recall Core Library
//!
//! Domain types and pure logic for the agent-recall retrieval layer:
//! conversation-aware fusion of a static knowledge base with a fast-mutating
//! conversation memory.
//!
//! # Architecture
//!
//! This crate defines:
//! - Domain types ([`SearchResult`], [`Query`], [`TimeRange`], the metadata bag)
//! - The [`VectorSearchStore`] trait implemented by backing-store adapters
//! - Error types and the [`RecallResult<T>`] alias
//! - Configuration structures with validation ([`MergeConfig`], [`IndexConfig`])
//! - Temporal decay ([`TemporalDecay`]) and result fusion ([`ResultMerger`])
//! - An in-memory stub store for tests ([`stubs::InMemoryVectorStore`])
//!
//! # Example
//!
//! ```
//! use agent_recall_core::{MergeConfig, ResultMerger};
//!
//! let merger = ResultMerger::new(MergeConfig::default()).unwrap();
//! assert_eq!(merger.config().rrf_k, 60);
//! ```

pub mod config;
pub mod decay;
pub mod error;
pub mod fusion;
pub mod store;
pub mod stubs;
pub mod types;

// Re-exports for convenience
pub use config::{IndexConfig, MergeAlgorithm, MergeConfig, RecallConfig};
pub use decay::TemporalDecay;
pub use error::{RecallError, RecallResult};
pub use fusion::ResultMerger;
pub use store::VectorSearchStore;
pub use types::{Metadata, Query, SearchResult, Source, TimeRange};
