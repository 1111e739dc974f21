//! `GET /conversations`, `GET /conversations/{id}` — read-only views
//! scoped to the requesting account; conversations are per-account
//! data, so an id belonging to another account is reported as
//! not found rather than forbidden.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use pck_core::{Conversation, ConversationId};

use crate::auth::AccountIdHeader;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list_conversations(
    State(state): State<AppState>,
    AccountIdHeader(account_id): AccountIdHeader,
) -> ApiResult<Json<Vec<Conversation>>> {
    let conversations = state.store.conversations_for_account(&account_id)?;
    Ok(Json(conversations))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    AccountIdHeader(account_id): AccountIdHeader,
    Path(id): Path<ConversationId>,
) -> ApiResult<Json<Conversation>> {
    let conversation = state
        .store
        .get_conversation(id)?
        .filter(|c| c.account_id == account_id)
        .ok_or_else(|| ApiError::not_found(format!("conversation {id} not found")))?;
    Ok(Json(conversation))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conversations", get(list_conversations))
        .route("/conversations/:id", get(get_conversation))
}
