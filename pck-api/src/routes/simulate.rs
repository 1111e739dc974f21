//! `POST /simulate` — projects an outcome distribution and ranked
//! differentiators for the given entity references.

use axum::{extract::State, routing::post, Json, Router};
use pck_reasoner::{ResolveInput, SimulationResult};

use crate::error::ApiResult;
use crate::state::AppState;
use crate::types::SimulateRequest;

pub async fn simulate(
    State(state): State<AppState>,
    Json(req): Json<SimulateRequest>,
) -> ApiResult<Json<SimulationResult>> {
    let inputs: Vec<ResolveInput> = req.entities.into_iter().map(Into::into).collect();
    let result = state.reasoner.simulate(&inputs)?;
    Ok(Json(result))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/simulate", post(simulate))
}
