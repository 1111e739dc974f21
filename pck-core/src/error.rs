//! Error types for the PCK graph engine

use thiserror::Error;

/// Store-layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("attempted to append an event to completed trajectory {trajectory_id}")]
    TrajectoryClosed { trajectory_id: String },

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Tag-parsing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid tag pattern at byte offset {offset}: {reason}")]
    InvalidTag { offset: usize, reason: String },
}

/// Trajectory-engine errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("trajectory {0} not found")]
    TrajectoryNotFound(String),

    #[error("trajectory {0} is already completed")]
    AlreadyCompleted(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Graph-reasoner errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReasonerError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrator-level errors — the spec's `Unauthorized`/`Forbidden`
/// error kinds live here since they only make sense at the account
/// boundary, not inside the graph-structural layers below.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("account id is missing or empty")]
    Unauthorized,

    #[error("entity {0} is not visible to this account")]
    Forbidden(String),

    #[error("llm backend unavailable: {0}")]
    LlmUnavailable(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Reasoner(#[from] ReasonerError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for the PCK graph engine.
#[derive(Debug, Clone, Error)]
pub enum PckError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("reasoner error: {0}")]
    Reasoner(#[from] ReasonerError),

    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for PCK graph-engine operations.
pub type PckResult<T> = Result<T, PckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_into_master_error() {
        let e: PckError = StoreError::NotFound {
            entity: "entity",
            id: "abc".into(),
        }
        .into();
        assert!(matches!(e, PckError::Store(_)));
    }

    #[test]
    fn engine_error_wraps_store_error_transparently() {
        let store_err = StoreError::LockPoisoned;
        let engine_err: EngineError = store_err.clone().into();
        assert_eq!(engine_err, EngineError::Store(store_err));
    }
}
