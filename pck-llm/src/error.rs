//! Errors a `LLMClient` implementation can surface.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("rate limited by provider")]
    RateLimited,

    #[error("invalid or missing api key")]
    InvalidApiKey,

    #[error("provider error: {0}")]
    Provider(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),
}
