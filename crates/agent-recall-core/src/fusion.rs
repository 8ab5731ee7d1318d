//! Result fusion across the static and conversation indices.
//!
//! Two algorithms are supported:
//!
//! - **Weighted**: `fused = score * weight`, with temporal decay folded into
//!   the conversation side. Predictable and monotone.
//! - **RRF**: rank-based, `contribution = weight / (k + rank)` with rank
//!   starting at 0. Robust to absolute-score skew between the two
//!   collections. The conversation list is decayed *before* rank extraction
//!   so that ranking reflects recency.
//!
//! In both modes an identifier appearing in both sets has its contributions
//! summed; that is the only path by which the two collections reinforce each
//! other.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{MergeAlgorithm, MergeConfig};
use crate::decay::TemporalDecay;
use crate::error::RecallResult;
use crate::types::SearchResult;

/// Contribution of a single rank to an RRF score.
#[inline]
pub fn rrf_contribution(rank: usize, k: f64) -> f64 {
    1.0 / (k + rank as f64)
}

/// Fuses static and conversation result sets into a single ranked list.
#[derive(Debug, Clone)]
pub struct ResultMerger {
    config: MergeConfig,
    decay: TemporalDecay,
}

impl ResultMerger {
    /// Create a merger, validating the configuration first.
    pub fn new(config: MergeConfig) -> RecallResult<Self> {
        config.validate()?;
        let decay = TemporalDecay::from_config(&config);
        Ok(Self { config, decay })
    }

    /// Replace the configuration, rebuilding the decay parameters.
    ///
    /// An invalid configuration leaves the current one in effect.
    pub fn set_config(&mut self, config: MergeConfig) -> RecallResult<()> {
        config.validate()?;
        self.decay = TemporalDecay::from_config(&config);
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn decay(&self) -> &TemporalDecay {
        &self.decay
    }

    /// Merge the two result sets and truncate to `limit`.
    ///
    /// `limit == 0` means no truncation. The output is sorted strictly
    /// descending by fused score; ties keep first-seen input order, so equal
    /// inputs always produce equal output.
    pub fn merge(
        &self,
        static_results: Vec<SearchResult>,
        conversation_results: Vec<SearchResult>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Vec<SearchResult> {
        let static_count = static_results.len();
        let conversation_count = conversation_results.len();

        let mut merged = match self.config.algorithm {
            MergeAlgorithm::Weighted => {
                self.merge_weighted(static_results, conversation_results, now)
            }
            MergeAlgorithm::Rrf => self.merge_rrf(static_results, conversation_results, now),
        };

        if limit > 0 && merged.len() > limit {
            merged.truncate(limit);
        }

        debug!(
            algorithm = self.config.algorithm.as_str(),
            static_count,
            conversation_count,
            merged_count = merged.len(),
            "fused result sets"
        );

        merged
    }

    fn merge_weighted(
        &self,
        static_results: Vec<SearchResult>,
        conversation_results: Vec<SearchResult>,
        now: DateTime<Utc>,
    ) -> Vec<SearchResult> {
        let mut fused = FusedList::with_capacity(static_results.len() + conversation_results.len());

        for result in static_results {
            let score = result.score * self.config.static_weight;
            fused.add(result, score);
        }

        for result in conversation_results {
            let weighted = result.score * self.config.conversation_weight;
            let score = match result.timestamp {
                Some(timestamp) => self.decay.apply(weighted, timestamp, now),
                // No timestamp: weighted only, never decayed against "now".
                None => weighted,
            };
            fused.add(result, score);
        }

        fused.into_sorted()
    }

    fn merge_rrf(
        &self,
        static_results: Vec<SearchResult>,
        conversation_results: Vec<SearchResult>,
        now: DateTime<Utc>,
    ) -> Vec<SearchResult> {
        let k = f64::from(self.config.rrf_k);
        let mut fused = FusedList::with_capacity(static_results.len() + conversation_results.len());

        for (rank, result) in static_results.into_iter().enumerate() {
            let score = self.config.static_weight * rrf_contribution(rank, k);
            fused.add(result, score);
        }

        // Decay first, then rank, so recency shapes the conversation ranking.
        let mut decayed = self.decay.apply_to_results(conversation_results, now);
        sort_by_score_descending(&mut decayed);

        for (rank, result) in decayed.into_iter().enumerate() {
            let score = self.config.conversation_weight * rrf_contribution(rank, k);
            fused.add(result, score);
        }

        fused.into_sorted()
    }
}

/// Accumulates fused scores per identifier while keeping first-seen order,
/// which makes the final (stable) sort deterministic for equal scores.
struct FusedList {
    entries: Vec<SearchResult>,
    by_id: HashMap<String, usize>,
}

impl FusedList {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            by_id: HashMap::with_capacity(capacity),
        }
    }

    fn add(&mut self, mut record: SearchResult, fused_score: f64) {
        match self.by_id.get(&record.id) {
            Some(&index) => {
                // Cross-source match: contributions sum, first payload wins.
                self.entries[index].score += fused_score;
            }
            None => {
                record.score = fused_score;
                self.by_id.insert(record.id.clone(), self.entries.len());
                self.entries.push(record);
            }
        }
    }

    fn into_sorted(self) -> Vec<SearchResult> {
        let mut entries = self.entries;
        sort_by_score_descending(&mut entries);
        entries
    }
}

fn sort_by_score_descending(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}
