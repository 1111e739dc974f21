//! `POST /chat` — runs one turn to completion and returns the final
//! reply plus the trajectory summary. `POST /chat/stream` (in
//! `stream.rs`) is the SSE counterpart for callers that want the
//! interleaved chunk/trajectory_event feed as it happens.

use axum::{extract::State, routing::post, Json, Router};
use futures_util::StreamExt;
use pck_agent::{CancellationToken, ChatTurnInput, OrchestratorEvent};

use crate::auth::AccountIdHeader;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::types::{ChatRequest, ChatResponse};

pub async fn chat(
    State(state): State<AppState>,
    AccountIdHeader(account_id): AccountIdHeader,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let input = ChatTurnInput {
        account_id,
        conversation_id: req.conversation_id,
        message: req.message,
    };
    let mut stream = state
        .orchestrator
        .run_turn(input, CancellationToken::new());

    let mut reply = String::new();
    while let Some(event) = stream.next().await {
        match event {
            OrchestratorEvent::Chunk(chunk) => reply = chunk.full_content,
            OrchestratorEvent::Complete(payload) => {
                return Ok(Json(ChatResponse {
                    conversation_id: payload.conversation_id,
                    message: reply,
                    trajectory: payload.trajectory,
                }));
            }
            OrchestratorEvent::Error(e) => return Err(ApiError::new_unavailable(e.message)),
            OrchestratorEvent::TrajectoryEvent(_) => {}
        }
    }

    Err(ApiError::internal(
        "orchestrator stream ended without a complete or error event",
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}
