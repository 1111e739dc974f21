//! `GET /entities/{id}` — one node's detail view, restricted to
//! accounts that have actually touched it (see `pck_query::GraphQuery`
//! doc comment: an entity is global, but its detail view is not).

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use pck_core::EntityId;
use pck_query::EntityView;

use crate::auth::AccountIdHeader;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn get_entity(
    State(state): State<AppState>,
    AccountIdHeader(account_id): AccountIdHeader,
    Path(id): Path<EntityId>,
) -> ApiResult<Json<EntityView>> {
    let view = state
        .query
        .get_entity(&account_id, id)?
        .ok_or_else(|| ApiError::not_found(format!("entity {id} not found")))?;
    Ok(Json(view))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/entities/:id", get(get_entity))
}
