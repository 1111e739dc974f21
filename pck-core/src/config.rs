//! Configuration for the PCK graph engine.
//!
//! All fields have sane defaults; every field is also overridable via
//! an environment variable so a deployment can tune the engine without
//! a rebuild, following the same `from_env()`-with-fallback idiom used
//! throughout this lineage's configuration types.

use crate::{ConfigError, PckResult};

/// Tunables for `GraphReasoner` and `GraphQuery`.
#[derive(Debug, Clone, PartialEq)]
pub struct PckConfig {
    /// Default BFS hop count for `GraphQuery::get_graph` when the
    /// caller does not specify one.
    pub default_graph_depth: u32,
    /// Default minimum edge weight for `GraphQuery::get_graph`.
    pub default_min_weight: u64,
    /// How many co-occurrence candidates `find_differentiators_from_structure`
    /// considers before ranking (spec: top 20).
    pub differentiator_candidate_pool: usize,
    /// How many differentiators `simulate` returns (spec: top 5).
    pub differentiator_result_cap: usize,
    /// Magnitude below which a differentiator is dropped (spec: 0.1).
    pub differentiator_magnitude_cutoff: f64,
    /// Minimum total observations below which `counterfactual` forces
    /// `netEffect = uncertain` (spec: 5).
    pub counterfactual_uncertainty_floor: u64,
    /// Magnitude below which `counterfactual`'s net effect is
    /// classified `neutral` rather than positive/negative (spec: 0.05).
    pub counterfactual_neutral_threshold: f64,
    /// Wall-clock timeout for one `LLMClient::stream_chat` call.
    pub llm_timeout_ms: u64,
    /// SSE keep-alive ping interval for `/chat/stream`.
    pub sse_keep_alive_ms: u64,
}

impl Default for PckConfig {
    fn default() -> Self {
        Self {
            default_graph_depth: 2,
            default_min_weight: 0,
            differentiator_candidate_pool: 20,
            differentiator_result_cap: 5,
            differentiator_magnitude_cutoff: 0.1,
            counterfactual_uncertainty_floor: 5,
            counterfactual_neutral_threshold: 0.05,
            llm_timeout_ms: 30_000,
            sse_keep_alive_ms: 15_000,
        }
    }
}

impl PckConfig {
    /// Build a `PckConfig` from environment variables, falling back to
    /// `Default` for anything unset or unparsable.
    ///
    /// Environment variables:
    /// - `PCK_DEFAULT_GRAPH_DEPTH`
    /// - `PCK_DEFAULT_MIN_WEIGHT`
    /// - `PCK_DIFFERENTIATOR_CANDIDATE_POOL`
    /// - `PCK_DIFFERENTIATOR_RESULT_CAP`
    /// - `PCK_DIFFERENTIATOR_MAGNITUDE_CUTOFF`
    /// - `PCK_COUNTERFACTUAL_UNCERTAINTY_FLOOR`
    /// - `PCK_COUNTERFACTUAL_NEUTRAL_THRESHOLD`
    /// - `PCK_LLM_TIMEOUT_MS`
    /// - `PCK_SSE_KEEP_ALIVE_MS`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        }

        Self {
            default_graph_depth: env_or("PCK_DEFAULT_GRAPH_DEPTH", defaults.default_graph_depth),
            default_min_weight: env_or("PCK_DEFAULT_MIN_WEIGHT", defaults.default_min_weight),
            differentiator_candidate_pool: env_or(
                "PCK_DIFFERENTIATOR_CANDIDATE_POOL",
                defaults.differentiator_candidate_pool,
            ),
            differentiator_result_cap: env_or(
                "PCK_DIFFERENTIATOR_RESULT_CAP",
                defaults.differentiator_result_cap,
            ),
            differentiator_magnitude_cutoff: env_or(
                "PCK_DIFFERENTIATOR_MAGNITUDE_CUTOFF",
                defaults.differentiator_magnitude_cutoff,
            ),
            counterfactual_uncertainty_floor: env_or(
                "PCK_COUNTERFACTUAL_UNCERTAINTY_FLOOR",
                defaults.counterfactual_uncertainty_floor,
            ),
            counterfactual_neutral_threshold: env_or(
                "PCK_COUNTERFACTUAL_NEUTRAL_THRESHOLD",
                defaults.counterfactual_neutral_threshold,
            ),
            llm_timeout_ms: env_or("PCK_LLM_TIMEOUT_MS", defaults.llm_timeout_ms),
            sse_keep_alive_ms: env_or("PCK_SSE_KEEP_ALIVE_MS", defaults.sse_keep_alive_ms),
        }
    }

    /// Validates the configuration, mirroring the range checks this
    /// lineage's other config types perform before a runtime starts.
    pub fn validate(&self) -> PckResult<()> {
        if self.default_graph_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_graph_depth".to_string(),
                value: self.default_graph_depth.to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.differentiator_magnitude_cutoff) {
            return Err(ConfigError::InvalidValue {
                field: "differentiator_magnitude_cutoff".to_string(),
                value: self.differentiator_magnitude_cutoff.to_string(),
                reason: "must be between 0.0 and 1.0".to_string(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.counterfactual_neutral_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "counterfactual_neutral_threshold".to_string(),
                value: self.counterfactual_neutral_threshold.to_string(),
                reason: "must be between 0.0 and 1.0".to_string(),
            }
            .into());
        }
        if self.llm_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm_timeout_ms".to_string(),
                value: self.llm_timeout_ms.to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
