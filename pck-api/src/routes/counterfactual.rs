//! `POST /counterfactual` — compares a base simulation against the
//! same situation with one entity swapped.

use axum::{extract::State, routing::post, Json, Router};
use pck_reasoner::{ChangeSpec, CounterfactualResult, ResolveInput};

use crate::error::ApiResult;
use crate::state::AppState;
use crate::types::CounterfactualRequest;

pub async fn counterfactual(
    State(state): State<AppState>,
    Json(req): Json<CounterfactualRequest>,
) -> ApiResult<Json<CounterfactualResult>> {
    let base: Vec<ResolveInput> = req.base_entities.into_iter().map(Into::into).collect();
    let change = ChangeSpec {
        from: req.change.from.into(),
        to: req.change.to.into(),
    };
    let result = state.reasoner.counterfactual(&base, change)?;
    Ok(Json(result))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/counterfactual", post(counterfactual))
}
