//! `GET /trajectories`, `GET /trajectories/{id}` — read-only views
//! scoped to the requesting account.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use pck_core::{Trajectory, TrajectoryId};

use crate::auth::AccountIdHeader;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list_trajectories(
    State(state): State<AppState>,
    AccountIdHeader(account_id): AccountIdHeader,
) -> ApiResult<Json<Vec<Trajectory>>> {
    let trajectories = state.store.trajectories_for_account(&account_id)?;
    Ok(Json(trajectories))
}

pub async fn get_trajectory(
    State(state): State<AppState>,
    AccountIdHeader(account_id): AccountIdHeader,
    Path(id): Path<TrajectoryId>,
) -> ApiResult<Json<Trajectory>> {
    let trajectory = state
        .store
        .get_trajectory(id)?
        .filter(|t| t.account_id == account_id)
        .ok_or_else(|| ApiError::not_found(format!("trajectory {id} not found")))?;
    Ok(Json(trajectory))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trajectories", get(list_trajectories))
        .route("/trajectories/:id", get(get_trajectory))
}
