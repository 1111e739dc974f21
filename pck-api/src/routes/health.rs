//! GET /healthz — liveness only. No database dependency to check:
//! the in-process store either answers or the process is down.

use axum::{extract::State, routing::get, Json, Router};

use crate::state::AppState;
use crate::types::HealthResponse;

pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}
