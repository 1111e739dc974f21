//! SSE-bound event payloads yielded by `AgentOrchestrator::run_turn`.
//!
//! `pck-api` assigns the monotonic per-stream `id` and wraps these in
//! an `axum::response::sse::Event`; this crate only owns `type`/`data`.
//! Tagged the same way CALIBER's `WsEvent` is tagged, so the wire shape
//! is `{"type": "...", "data": {...}}`.

use pck_core::{ConversationId, EntityId, EntityType, MessageId, TrajectoryId};
use pck_engine::TrajectoryCompletion;
use serde::Serialize;

/// Mirrors `pck_core::EventType` plus the one orchestrator-only kind
/// (`trajectory_start`) that never becomes a persisted `Event` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryEventKind {
    TrajectoryStart,
    Touch,
    Discover,
    Reason,
    Simulate,
    Decide,
}

/// Which half of the turn produced a tag mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagSource {
    User,
    Assistant,
}

/// `trajectory_event.data` — `event_type` is always present; the rest
/// are populated only for the event kinds that carry them (see §6.2).
#[derive(Debug, Clone, Serialize)]
pub struct TrajectoryEventPayload {
    pub event_type: TrajectoryEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<TagSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub differentiator_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unresolved_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_patterns: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities_referenced: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_entities: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_used: Option<bool>,
}

impl TrajectoryEventPayload {
    pub fn kind(event_type: TrajectoryEventKind) -> Self {
        Self {
            event_type,
            entity_id: None,
            name: None,
            entity_type: None,
            source: None,
            outcome_count: None,
            differentiator_count: None,
            resolved_count: None,
            unresolved_count: None,
            has_patterns: None,
            action: None,
            entities_referenced: None,
            new_entities: None,
            simulation_used: None,
        }
    }

    pub fn touch(entity_id: EntityId, name: String, entity_type: EntityType, source: TagSource) -> Self {
        Self {
            entity_id: Some(entity_id),
            name: Some(name),
            entity_type: Some(entity_type),
            source: Some(source),
            ..Self::kind(TrajectoryEventKind::Touch)
        }
    }

    pub fn discover(entity_id: EntityId, name: String, entity_type: EntityType, source: TagSource) -> Self {
        Self {
            entity_id: Some(entity_id),
            name: Some(name),
            entity_type: Some(entity_type),
            source: Some(source),
            ..Self::kind(TrajectoryEventKind::Discover)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkPayload {
    pub content: String,
    pub full_content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletePayload {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
    pub trajectory_id: TrajectoryId,
    pub trajectory: TrajectoryCompletion,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One event in the per-turn SSE feed. `pck-api` serializes `data` and
/// stamps it with a monotonic `id` before writing it to the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    TrajectoryEvent(TrajectoryEventPayload),
    Chunk(ChunkPayload),
    Complete(CompletePayload),
    Error(ErrorPayload),
}

impl OrchestratorEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
            error: None,
        })
    }

    pub fn error_with_detail(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
            error: Some(error.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trajectory_event_serializes_with_tagged_envelope() {
        let event = OrchestratorEvent::TrajectoryEvent(TrajectoryEventPayload::kind(
            TrajectoryEventKind::TrajectoryStart,
        ));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "trajectory_event");
        assert_eq!(json["data"]["event_type"], "trajectory_start");
        assert!(json["data"].get("entity_id").is_none());
    }

    #[test]
    fn chunk_event_carries_content_and_full_content() {
        let event = OrchestratorEvent::Chunk(ChunkPayload {
            content: "lo".to_string(),
            full_content: "hello".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "chunk");
        assert_eq!(json["data"]["content"], "lo");
        assert_eq!(json["data"]["full_content"], "hello");
    }
}
