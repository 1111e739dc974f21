//! `LLMClient`: the abstract streaming-chat boundary `pck-agent` drives
//! its per-turn state machine against.
//!
//! Deliberately narrow next to CALIBER's `EmbeddingProvider` /
//! `SummarizationProvider` pair — this spec has no vector store and no
//! batch summarization job, just one streaming completion call per
//! turn. `AnthropicClient` is the real provider; `MockLlmClient` is
//! what `pck-agent` falls back to when no API key is configured, so
//! the rest of the system still has something deterministic to drive
//! against in tests and in local/offline runs.

mod anthropic;
mod error;
mod mock;

pub use anthropic::AnthropicClient;
pub use error::LlmError;
pub use mock::MockLlmClient;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

/// Role of one message in a `ChatRequest`'s history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of chat history passed to `stream_chat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Everything `stream_chat` needs: the system prompt `pck-agent` built
/// (already carrying `format_for_ai`'s simulation text, when a
/// simulation ran this turn), the conversation so far, and a token
/// budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

/// A stream of incremental text chunks. Ends when the provider closes
/// its response; a mid-stream `Err` means the caller has already
/// emitted some assistant text and the orchestrator must still close
/// out the turn without completing the trajectory.
pub type ChatStream = BoxStream<'static, Result<String, LlmError>>;

#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, LlmError>;
}
