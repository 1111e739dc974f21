//! REST/SSE routes, one module per resource.

pub mod chat;
pub mod conversations;
pub mod counterfactual;
pub mod entities;
pub mod graph;
pub mod health;
pub mod simulate;
pub mod stream;
pub mod trajectories;

use axum::Router;

use crate::state::AppState;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(chat::router())
        .merge(stream::router())
        .merge(conversations::router())
        .merge(trajectories::router())
        .merge(graph::router())
        .merge(entities::router())
        .merge(simulate::router())
        .merge(counterfactual::router())
}
