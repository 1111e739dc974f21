//! Shared application state for the Axum router.

use std::sync::Arc;
use std::time::Instant;

use pck_agent::AgentOrchestrator;
use pck_core::PckConfig;
use pck_query::GraphQuery;
use pck_reasoner::GraphReasoner;
use pck_storage::Store;

use crate::config::ApiConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub orchestrator: Arc<AgentOrchestrator>,
    pub reasoner: Arc<GraphReasoner>,
    pub query: Arc<GraphQuery>,
    pub config: PckConfig,
    pub api_config: Arc<ApiConfig>,
    pub start_time: Instant,
}
