//! Configuration management for agent-recall.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RecallError, RecallResult};

/// Default weight for knowledge-base scores.
pub const DEFAULT_STATIC_WEIGHT: f64 = 0.6;
/// Default weight for conversation scores.
pub const DEFAULT_CONVERSATION_WEIGHT: f64 = 0.4;
/// Default decay half-life in minutes.
pub const DEFAULT_HALF_LIFE_MINUTES: f64 = 30.0;
/// Default floor for the decay multiplier.
pub const DEFAULT_MIN_TEMPORAL_WEIGHT: f64 = 0.01;
/// Default Reciprocal Rank Fusion smoothing constant.
pub const DEFAULT_RRF_K: u32 = 60;

/// Fusion algorithm selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeAlgorithm {
    /// Additive score combination with per-source scalar weights
    #[default]
    Weighted,
    /// Reciprocal Rank Fusion: contribution `w / (k + rank)`
    #[serde(alias = "reciprocal_rank_fusion")]
    Rrf,
}

impl MergeAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeAlgorithm::Weighted => "weighted",
            MergeAlgorithm::Rrf => "rrf",
        }
    }
}

/// Fusion parameters.
///
/// The two weights are independent scaling factors in `[0, 1]`; they need not
/// sum to 1. Invariants are enforced at construction and on every update via
/// [`MergeConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeConfig {
    /// Scales knowledge-base scores
    pub static_weight: f64,

    /// Scales conversation scores; also gates the RRF contribution
    pub conversation_weight: f64,

    /// When false, record age has no effect on scores
    pub temporal_decay_enabled: bool,

    /// Age in minutes at which the decay multiplier reaches one half
    pub half_life_minutes: f64,

    /// Floor for the decay multiplier, so ancient turns can still tie-break
    pub min_temporal_weight: f64,

    /// Which fusion algorithm to run
    pub algorithm: MergeAlgorithm,

    /// RRF smoothing constant `k`
    pub rrf_k: u32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            static_weight: DEFAULT_STATIC_WEIGHT,
            conversation_weight: DEFAULT_CONVERSATION_WEIGHT,
            temporal_decay_enabled: true,
            half_life_minutes: DEFAULT_HALF_LIFE_MINUTES,
            min_temporal_weight: DEFAULT_MIN_TEMPORAL_WEIGHT,
            algorithm: MergeAlgorithm::Weighted,
            rrf_k: DEFAULT_RRF_K,
        }
    }
}

impl MergeConfig {
    /// Validate configuration values.
    ///
    /// NaN weights fail the range checks and are rejected.
    pub fn validate(&self) -> RecallResult<()> {
        if !(0.0..=1.0).contains(&self.static_weight) {
            return Err(RecallError::InvalidWeight);
        }
        if !(0.0..=1.0).contains(&self.conversation_weight) {
            return Err(RecallError::InvalidWeight);
        }
        if !(self.half_life_minutes > 0.0) {
            return Err(RecallError::InvalidHalfLife);
        }
        if !(0.0..=1.0).contains(&self.min_temporal_weight) {
            return Err(RecallError::InvalidMinWeight);
        }
        if self.rrf_k == 0 {
            return Err(RecallError::InvalidRrfK);
        }
        Ok(())
    }
}

/// Names of the two logical collections and how the backing store embeds
/// them. Immutable after construction; vectorizer and metric are recorded
/// only, never enforced by this layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexConfig {
    pub static_index_name: String,
    pub conversation_index_name: String,
    pub vectorizer: String,
    pub distance_metric: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            static_index_name: "KnowledgeBase".to_string(),
            conversation_index_name: "Conversation".to_string(),
            vectorizer: "text2vec-transformers".to_string(),
            distance_metric: "cosine".to_string(),
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> RecallResult<()> {
        if self.static_index_name.is_empty() {
            return Err(RecallError::Config(
                "static index name must not be empty".into(),
            ));
        }
        if self.conversation_index_name.is_empty() {
            return Err(RecallError::Config(
                "conversation index name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration loaded from files and environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    pub merge: MergeConfig,
    pub index: IndexConfig,
}

impl RecallConfig {
    /// Load configuration from files and environment.
    ///
    /// Sources are layered in order:
    /// 1. `config/default.toml` (base settings)
    /// 2. `config/{AGENT_RECALL_ENV}.toml` (environment-specific)
    /// 3. Environment variables with the `AGENT_RECALL` prefix
    pub fn load() -> RecallResult<Self> {
        let env = std::env::var("AGENT_RECALL_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("AGENT_RECALL").separator("__"));

        let config: RecallConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> RecallResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RecallError::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;

        let config: RecallConfig = toml::from_str(&content)
            .map_err(|e| RecallError::Config(format!("failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RecallResult<()> {
        self.merge.validate()?;
        self.index.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_merge_config_is_valid() {
        let config = MergeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.static_weight, 0.6);
        assert_eq!(config.conversation_weight, 0.4);
        assert!(config.temporal_decay_enabled);
        assert_eq!(config.half_life_minutes, 30.0);
        assert_eq!(config.rrf_k, 60);
    }

    #[test]
    fn test_weight_out_of_range() {
        let config = MergeConfig {
            static_weight: 1.5,
            ..MergeConfig::default()
        };
        assert!(matches!(config.validate(), Err(RecallError::InvalidWeight)));

        let config = MergeConfig {
            conversation_weight: -0.1,
            ..MergeConfig::default()
        };
        assert!(matches!(config.validate(), Err(RecallError::InvalidWeight)));
    }

    #[test]
    fn test_nan_weight_rejected() {
        let config = MergeConfig {
            static_weight: f64::NAN,
            ..MergeConfig::default()
        };
        assert!(matches!(config.validate(), Err(RecallError::InvalidWeight)));
    }

    #[test]
    fn test_half_life_must_be_positive() {
        for bad in [0.0, -5.0, f64::NAN] {
            let config = MergeConfig {
                half_life_minutes: bad,
                ..MergeConfig::default()
            };
            assert!(matches!(config.validate(), Err(RecallError::InvalidHalfLife)));
        }
    }

    #[test]
    fn test_min_weight_out_of_range() {
        let config = MergeConfig {
            min_temporal_weight: 1.01,
            ..MergeConfig::default()
        };
        assert!(matches!(config.validate(), Err(RecallError::InvalidMinWeight)));
    }

    #[test]
    fn test_rrf_k_must_be_positive() {
        let config = MergeConfig {
            rrf_k: 0,
            ..MergeConfig::default()
        };
        assert!(matches!(config.validate(), Err(RecallError::InvalidRrfK)));
    }

    #[test]
    fn test_algorithm_accepts_long_alias() {
        let config: MergeConfig =
            serde_json::from_str(r#"{"algorithm":"reciprocal_rank_fusion"}"#).unwrap();
        assert_eq!(config.algorithm, MergeAlgorithm::Rrf);

        let config: MergeConfig = serde_json::from_str(r#"{"algorithm":"rrf"}"#).unwrap();
        assert_eq!(config.algorithm, MergeAlgorithm::Rrf);
    }

    #[test]
    fn test_default_index_config() {
        let index = IndexConfig::default();
        assert_eq!(index.static_index_name, "KnowledgeBase");
        assert_eq!(index.conversation_index_name, "Conversation");
        assert_eq!(index.vectorizer, "text2vec-transformers");
        assert_eq!(index.distance_metric, "cosine");
    }

    #[test]
    fn test_recall_config_toml_round_trip() {
        let config = RecallConfig::default();
        let rendered = toml::to_string(&config).unwrap();
        let parsed: RecallConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_recall_config_rejects_empty_index_name() {
        let config = RecallConfig {
            index: IndexConfig {
                static_index_name: String::new(),
                ..IndexConfig::default()
            },
            ..RecallConfig::default()
        };
        assert!(matches!(config.validate(), Err(RecallError::Config(_))));
    }
}
