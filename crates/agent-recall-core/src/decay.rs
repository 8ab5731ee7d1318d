//! Temporal decay for conversation relevance scores.
//!
//! Scores from conversation memory are multiplied by an exponential decay
//! factor so that recent turns dominate and older context gracefully fades:
//!
//! `multiplier = clamp(exp(-ln 2 * age_minutes / half_life), min_weight, 1)`
//!
//! The upper clamp keeps future-dated records from gaining relevance; the
//! floor keeps ancient turns available for tie-breaking.

use chrono::{DateTime, Utc};

use crate::config::{DEFAULT_HALF_LIFE_MINUTES, MergeConfig};
use crate::types::{SearchResult, Source};

/// Time-based decay calculator for conversation scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalDecay {
    half_life_minutes: f64,
    min_weight: f64,
    enabled: bool,
}

impl TemporalDecay {
    pub fn new(half_life_minutes: f64, min_weight: f64, enabled: bool) -> Self {
        Self {
            half_life_minutes,
            min_weight,
            enabled,
        }
    }

    /// Build the decay calculator described by a [`MergeConfig`].
    pub fn from_config(config: &MergeConfig) -> Self {
        Self::new(
            config.half_life_minutes,
            config.min_temporal_weight,
            config.temporal_decay_enabled,
        )
    }

    /// Decay a score by the age of its record.
    ///
    /// `timestamp` is when the conversation turn occurred and `now` the
    /// reference wall-clock time. When decay is disabled the score passes
    /// through unchanged. Ages are measured with millisecond precision.
    pub fn apply(&self, score: f64, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        if !self.enabled {
            return score;
        }

        let age_minutes = (now - timestamp).num_milliseconds() as f64 / 60_000.0;
        let factor = (-std::f64::consts::LN_2 * age_minutes / self.half_life_minutes).exp();

        // Floor for ancient turns; cap at 1 so post-dated records gain nothing.
        score * factor.max(self.min_weight).min(1.0)
    }

    /// Decay every conversation record in a result list.
    ///
    /// Records from other sources, and conversation records without a
    /// timestamp, pass through unmodified. Input order is preserved.
    pub fn apply_to_results(
        &self,
        results: Vec<SearchResult>,
        now: DateTime<Utc>,
    ) -> Vec<SearchResult> {
        results
            .into_iter()
            .map(|mut result| {
                if result.source == Source::Conversation {
                    if let Some(timestamp) = result.timestamp {
                        result.score = self.apply(result.score, timestamp, now);
                    }
                }
                result
            })
            .collect()
    }

    pub fn half_life(&self) -> f64 {
        self.half_life_minutes
    }

    pub fn min_weight(&self) -> f64 {
        self.min_weight
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Half-life that retains `target_retention` of a score after
/// `retention_minutes`.
///
/// For example, keeping 10% relevance after two hours:
/// `half_life_from_retention(120.0, 0.1)` is roughly 36 minutes. Targets
/// outside `(0, 1)` fall back to the default half-life of 30 minutes.
pub fn half_life_from_retention(retention_minutes: f64, target_retention: f64) -> f64 {
    if target_retention <= 0.0 || target_retention >= 1.0 {
        return DEFAULT_HALF_LIFE_MINUTES;
    }
    // Solve target = exp(-ln 2 * retention / half_life) for half_life.
    -std::f64::consts::LN_2 * retention_minutes / target_retention.ln()
}
