//! Anthropic Messages API client, streaming via SSE.
//!
//! Rate limiting follows the semaphore-plus-minimum-interval shape
//! this lineage's Anthropic client has always used; what changes here
//! is the request itself, which asks for `stream: true` and yields
//! incremental `content_block_delta` text instead of one parsed JSON
//! response.

use crate::{ChatRequest, ChatRole, ChatStream, LLMClient, LlmError};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct WireErrorBody {
    error: WireErrorDetail,
}

#[derive(Deserialize)]
struct WireErrorDetail {
    message: String,
}

/// Streaming Anthropic Messages API client.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    rate_limiter: Arc<Semaphore>,
    last_request_ms: Arc<AtomicU64>,
    min_request_interval_ms: u64,
    started_at: Instant,
}

impl AnthropicClient {
    /// `requests_per_minute` governs both the semaphore's permit count
    /// and the minimum spacing enforced between requests.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, requests_per_minute: u32) -> Self {
        let requests_per_minute = requests_per_minute.max(1);
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: model.into(),
            rate_limiter: Arc::new(Semaphore::new(requests_per_minute as usize)),
            last_request_ms: Arc::new(AtomicU64::new(0)),
            min_request_interval_ms: (60_000 / requests_per_minute as u64).max(10),
            started_at: Instant::now(),
        }
    }

    async fn wait_for_slot(&self) {
        let now_ms = self.started_at.elapsed().as_millis() as u64;
        let last_ms = self.last_request_ms.load(Ordering::Relaxed);
        let elapsed = now_ms.saturating_sub(last_ms);
        if elapsed < self.min_request_interval_ms {
            tokio::time::sleep(Duration::from_millis(self.min_request_interval_ms - elapsed)).await;
        }
        self.last_request_ms.store(
            self.started_at.elapsed().as_millis() as u64,
            Ordering::Relaxed,
        );
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl LLMClient for AnthropicClient {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, LlmError> {
        let _permit = self
            .rate_limiter
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LlmError::Provider("rate limiter closed".to_string()))?;
        self.wait_for_slot().await;

        let messages: Vec<WireMessage> = request
            .messages
            .iter()
            .map(|m| WireMessage {
                role: match m.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: &m.content,
            })
            .collect();

        let body = WireRequest {
            model: &self.model,
            system: &request.system_prompt,
            messages,
            max_tokens: request.max_tokens,
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &text));
        }

        let mut byte_stream = response.bytes_stream();
        let chunk_stream = async_stream::stream! {
            let mut buffer = String::new();
            while let Some(next) = byte_stream.next().await {
                let bytes = match next {
                    Ok(b) => b,
                    Err(e) => {
                        yield Err(LlmError::Provider(format!("stream read failed: {e}")));
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(pos) = buffer.find("\n\n") {
                    let event: String = buffer.drain(..pos + 2).collect();
                    for text in parse_sse_event(&event) {
                        yield Ok(text);
                    }
                }
            }
        };

        Ok(Box::pin(chunk_stream))
    }
}

/// Extracts every `content_block_delta` text fragment out of one SSE
/// event block (a run of `field: value` lines ending at a blank line).
fn parse_sse_event(event: &str) -> Vec<String> {
    let mut texts = Vec::new();
    for line in event.lines() {
        let Some(data) = line.strip_prefix("data: ") else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(data) else {
            continue;
        };
        if value.get("type").and_then(Value::as_str) != Some("content_block_delta") {
            continue;
        }
        if let Some(text) = value.pointer("/delta/text").and_then(Value::as_str) {
            texts.push(text.to_string());
        }
    }
    texts
}

fn classify_error(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<WireErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());
    match status {
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::InvalidApiKey,
        _ => LlmError::Provider(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_delta_out_of_one_sse_event() {
        let event = "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"hi\"}}\n\n";
        assert_eq!(parse_sse_event(event), vec!["hi".to_string()]);
    }

    #[test]
    fn ignores_non_content_block_delta_events() {
        let event = "event: message_start\ndata: {\"type\":\"message_start\"}\n\n";
        assert!(parse_sse_event(event).is_empty());
    }

    #[test]
    fn classify_error_maps_status_codes() {
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, ""),
            LlmError::RateLimited
        ));
        assert!(matches!(
            classify_error(StatusCode::UNAUTHORIZED, ""),
            LlmError::InvalidApiKey
        ));
        assert!(matches!(
            classify_error(StatusCode::INTERNAL_SERVER_ERROR, "{\"error\":{\"message\":\"boom\"}}"),
            LlmError::Provider(ref m) if m == "boom"
        ));
    }

    #[test]
    fn rate_limit_interval_has_a_ten_millisecond_floor() {
        let client = AnthropicClient::new("key", "model", 10_000);
        assert_eq!(client.min_request_interval_ms, 10);
    }
}
