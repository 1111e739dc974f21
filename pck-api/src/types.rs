//! Request/response DTOs for the REST surface.
//!
//! Most GET endpoints serialize the graph crates' own domain types
//! directly (`Entity`, `Trajectory`, `GraphView`, `SimulationResult`,
//! ...); this module only covers the shapes with no existing
//! counterpart — request bodies, and the `/chat` unary response.

use pck_core::{ConversationId, EntityId, EntityType};
use pck_engine::TrajectoryCompletion;
use pck_reasoner::ResolveInput;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<ConversationId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub conversation_id: ConversationId,
    pub message: String,
    pub trajectory: TrajectoryCompletion,
}

/// One `{name, type?}` slot in a `/simulate` or `/counterfactual` body.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityRef {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: Option<EntityType>,
}

impl From<EntityRef> for ResolveInput {
    fn from(value: EntityRef) -> Self {
        ResolveInput::new(value.name, value.entity_type)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulateRequest {
    pub entities: Vec<EntityRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeSpecRequest {
    pub from: EntityRef,
    pub to: EntityRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CounterfactualRequest {
    pub base_entities: Vec<EntityRef>,
    pub change: ChangeSpecRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetGraphQuery {
    pub center_entity_id: Option<EntityId>,
    pub depth: Option<u32>,
    pub min_weight: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}
