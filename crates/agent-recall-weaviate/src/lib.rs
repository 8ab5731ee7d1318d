//! Weaviate adapter for agent-recall.
//!
//! Translates structured queries into the Weaviate GraphQL dialect, executes
//! them over HTTP, and parses nested responses back into typed results.
//! The adapter never embeds text; the backing store's configured vectorizer
//! does that server-side.

pub mod client;
mod parse;
pub mod query;

pub use client::{WeaviateClient, WeaviateConfig, DEFAULT_TIMEOUT_SECS};
pub use query::{FilterValue, QueryBuilder, WhereFilter};
