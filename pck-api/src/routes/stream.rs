//! `POST /chat/stream` — the SSE counterpart to `chat.rs`'s unary
//! handler. Maps `AgentOrchestrator::run_turn`'s event stream directly
//! into `axum::response::sse::Event`s; this crate's only job is to
//! stamp a monotonic `id` and split each tagged `{type, data}` payload
//! into the SSE record's `event:`/`data:` fields.
//!
//! The underlying turn is not restartable — a fresh `POST` always
//! starts a brand new trajectory. `last_event_id` only seeds where
//! this stream's own id counter resumes from, so a reconnecting
//! client's merged event log stays monotonic across the gap; it does
//! not replay anything from the dropped connection.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use pck_agent::{CancellationToken, ChatTurnInput};
use pck_core::ConversationId;
use serde::Deserialize;

use crate::auth::AccountIdHeader;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatStreamRequest {
    pub message: String,
    pub conversation_id: Option<ConversationId>,
    pub last_event_id: Option<u64>,
}

pub async fn chat_stream(
    State(state): State<AppState>,
    AccountIdHeader(account_id): AccountIdHeader,
    Json(req): Json<ChatStreamRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let input = ChatTurnInput {
        account_id,
        conversation_id: req.conversation_id,
        message: req.message,
    };
    let mut orchestrator_stream = state
        .orchestrator
        .run_turn(input, CancellationToken::new());
    let start_id = req.last_event_id.map(|id| id + 1).unwrap_or(0);

    let stream = async_stream::stream! {
        let mut id = start_id;
        while let Some(event) = orchestrator_stream.next().await {
            let value = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);
            let event_type = value
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("error")
                .to_string();
            let data = value
                .get("data")
                .cloned()
                .unwrap_or(serde_json::Value::Null)
                .to_string();

            yield Ok(Event::default().id(id.to_string()).event(event_type).data(data));
            id += 1;
        }
    };

    let keep_alive = KeepAlive::new().interval(Duration::from_millis(state.config.sse_keep_alive_ms));
    Sse::new(stream).keep_alive(keep_alive)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/chat/stream", post(chat_stream))
}
