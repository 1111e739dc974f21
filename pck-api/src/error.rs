//! HTTP error mapping for the PCK API.
//!
//! Trimmed down from this lineage's `ApiError`/`ErrorCode` pair: one
//! `ErrorCode` per HTTP status class, one `ApiError` carrying a code,
//! a human message, and optional JSON details, serialized the same
//! way on every endpoint.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use pck_core::{AgentError, EngineError, PckError, ReasonerError, StoreError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    ValidationFailed,
    NotFound,
    Conflict,
    ServiceUnavailable,
    InternalError,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    /// An LLM or store outage surfaced through an orchestrator `error`
    /// event on the unary `/chat` path — retryable per spec §7.
    pub fn new_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        (status, Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match &e {
            StoreError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, e.to_string()),
            StoreError::AlreadyExists { .. } => ApiError::new(ErrorCode::Conflict, e.to_string()),
            StoreError::TrajectoryClosed { .. } => {
                ApiError::new(ErrorCode::Conflict, e.to_string())
            }
            StoreError::LockPoisoned => {
                ApiError::new(ErrorCode::InternalError, e.to_string())
            }
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::TrajectoryNotFound(_) => ApiError::new(ErrorCode::NotFound, e.to_string()),
            EngineError::AlreadyCompleted(_) => ApiError::new(ErrorCode::Conflict, e.to_string()),
            EngineError::Store(inner) => inner.into(),
        }
    }
}

impl From<ReasonerError> for ApiError {
    fn from(e: ReasonerError) -> Self {
        match e {
            ReasonerError::Store(inner) => inner.into(),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::Unauthorized => ApiError::new(ErrorCode::Unauthorized, e.to_string()),
            AgentError::Forbidden(_) => ApiError::new(ErrorCode::Forbidden, e.to_string()),
            AgentError::LlmUnavailable(_) => {
                ApiError::new(ErrorCode::ServiceUnavailable, e.to_string())
            }
            AgentError::Engine(inner) => inner.into(),
            AgentError::Reasoner(inner) => inner.into(),
            AgentError::Parse(_) => ApiError::new(ErrorCode::ValidationFailed, e.to_string()),
        }
    }
}

impl From<PckError> for ApiError {
    fn from(e: PckError) -> Self {
        match e {
            PckError::Store(inner) => inner.into(),
            PckError::Engine(inner) => inner.into(),
            PckError::Reasoner(inner) => inner.into(),
            PckError::Agent(inner) => inner.into(),
            PckError::Parse(_) => ApiError::new(ErrorCode::ValidationFailed, e.to_string()),
            PckError::Config(_) => ApiError::new(ErrorCode::InternalError, e.to_string()),
        }
    }
}
