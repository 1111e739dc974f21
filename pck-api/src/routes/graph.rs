//! `GET /graph?center_entity_id&depth&min_weight` — neighborhood view.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use pck_query::{GetGraphInput, GraphView};

use crate::auth::AccountIdHeader;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::types::GetGraphQuery;

pub async fn get_graph(
    State(state): State<AppState>,
    AccountIdHeader(account_id): AccountIdHeader,
    Query(query): Query<GetGraphQuery>,
) -> ApiResult<Json<GraphView>> {
    let view = state.query.get_graph(GetGraphInput {
        account_id,
        center_id: query.center_entity_id,
        depth: query.depth,
        min_weight: query.min_weight,
    })?;
    Ok(Json(view))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/graph", get(get_graph))
}
