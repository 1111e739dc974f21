//! HTTP/SSE transport for the trajectory and graph engine.
//!
//! Everything that matters — tag parsing, trajectory lifecycle, graph
//! mutation, structural inference, per-turn orchestration — lives in
//! the `pck-*` crates this one depends on. This crate only wires them
//! behind an Axum router: request/response framing, CORS, and the
//! account-id extraction that stands in for the auth layer this
//! system treats as an external collaborator.

pub mod auth;
pub mod config;
pub mod error;
mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

use std::sync::Arc;
use std::time::Instant;

use axum::http::{HeaderValue, Method};
use axum::Router;
use pck_agent::AgentOrchestrator;
use pck_core::PckConfig;
use pck_llm::LLMClient;
use pck_query::GraphQuery;
use pck_reasoner::GraphReasoner;
use pck_storage::Store;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

/// Builds the full router over a shared store and LLM client.
pub fn create_api_router(
    store: Arc<dyn Store>,
    llm: Arc<dyn LLMClient>,
    config: PckConfig,
    api_config: ApiConfig,
) -> Router {
    let orchestrator = Arc::new(AgentOrchestrator::new(
        Arc::clone(&store),
        llm,
        config.clone(),
    ));
    let reasoner = Arc::new(GraphReasoner::new(Arc::clone(&store), config.clone()));
    let query = Arc::new(GraphQuery::new(Arc::clone(&store), config.clone()));

    let state = AppState {
        store,
        orchestrator,
        reasoner,
        query,
        config,
        api_config: Arc::new(api_config),
        start_time: Instant::now(),
    };

    let cors = build_cors_layer(&state.api_config);

    routes::build_router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
        .max_age(std::time::Duration::from_secs(config.cors_max_age_secs));

    // A wildcard origin and credentialed requests are mutually
    // exclusive per the CORS spec; tower-http panics if both are set,
    // so credentials only apply once an explicit allow-list exists.
    if config.cors_origins.is_empty() {
        layer.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer
            .allow_origin(origins)
            .allow_credentials(config.cors_allow_credentials)
    }
}
