//! PCK API server entry point.
//!
//! Bootstraps configuration, wires an in-memory store and an LLM
//! client (real if `ANTHROPIC_API_KEY` is set, a deterministic mock
//! otherwise — per the design note that an absent provider must not
//! crash the server), and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use pck_api::{create_api_router, ApiConfig, ApiError, ApiResult};
use pck_core::PckConfig;
use pck_llm::{AnthropicClient, LLMClient, MockLlmClient};
use pck_storage::InMemoryStore;

#[tokio::main]
async fn main() -> ApiResult<()> {
    pck_api::telemetry::init_tracing();

    let config = PckConfig::from_env();
    config
        .validate()
        .map_err(|e| ApiError::internal(format!("invalid config: {e}")))?;

    let api_config = ApiConfig::from_env();

    let store: Arc<dyn pck_storage::Store> = Arc::new(InMemoryStore::new());
    let llm: Arc<dyn LLMClient> = build_llm_client();

    let app = create_api_router(store, llm, config, api_config);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "starting pck-api server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal(format!("failed to bind {addr}: {e}")))?;

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.map_err(|e| ApiError::internal(format!("server error: {e}")))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}

fn build_llm_client() -> Arc<dyn LLMClient> {
    match std::env::var("ANTHROPIC_API_KEY") {
        Ok(key) if !key.is_empty() => {
            let model = std::env::var("PCK_LLM_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-5".to_string());
            let rpm = std::env::var("PCK_LLM_REQUESTS_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(50);
            tracing::info!(%model, "using Anthropic LLM client");
            Arc::new(AnthropicClient::new(key, model, rpm))
        }
        _ => {
            tracing::warn!("ANTHROPIC_API_KEY not set, falling back to mock LLM client");
            Arc::new(MockLlmClient::default())
        }
    }
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("PCK_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("PCK_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("invalid port value: {port_str}")))?;

    let addr = format!("{host}:{port}");
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("invalid bind address {addr}: {e}")))
}
