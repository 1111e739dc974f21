//! Deterministic `LLMClient` used when no provider is configured, and
//! in every test that drives `pck-agent` without network access.

use crate::{ChatRequest, ChatStream, LLMClient, LlmError};
use async_trait::async_trait;

/// Splits a fixed or caller-supplied response into word-sized chunks
/// so callers exercise the same incremental-delivery path a real
/// provider would use, without any actual streaming I/O.
pub struct MockLlmClient {
    response: String,
}

impl MockLlmClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new(
            "I don't have a live model connected right now, but here's what the graph shows \
             so far.",
        )
    }
}

#[async_trait]
impl LLMClient for MockLlmClient {
    async fn stream_chat(&self, _request: ChatRequest) -> Result<ChatStream, LlmError> {
        let words: Vec<String> = self
            .response
            .split_inclusive(' ')
            .map(|w| w.to_string())
            .collect();

        let stream = async_stream::stream! {
            for word in words {
                yield Ok(word);
            }
        };

        Ok(Box::pin(stream))
    }
}
