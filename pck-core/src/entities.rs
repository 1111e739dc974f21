//! Core data structures for the knowledge graph and its trajectories.
//!
//! Entities, edges and co-occurrences are global — shared across every
//! account that has ever touched them. Trajectories, contributions,
//! conversations and messages are per-account.

use crate::*;
use serde::{Deserialize, Serialize};

/// A node in the knowledge graph.
///
/// `entity_type` is sticky: once set by a typed mention it is never
/// overwritten by a later, differently-typed mention of the same
/// `normalized_name`. `description` is first-writer-wins for the same
/// reason. `touch_count >= trajectory_count >= contributor_count >= 1`
/// holds once the mention that created the row has been fully logged
/// (its `log_event(touch)` recorded and its trajectory completed) —
/// the row starts at zero on creation and `TrajectoryEngine` is the
/// sole source of each counter's first increment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub normalized_name: String,
    pub entity_type: Option<EntityType>,
    pub description: Option<String>,
    pub touch_count: u64,
    pub trajectory_count: u64,
    pub contributor_count: u64,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
}

/// `(entity_id, account_id)` provenance row.
///
/// Exactly one row exists per pair; its creation is the sole trigger
/// for incrementing the parent entity's `contributor_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityContribution {
    pub entity_id: EntityId,
    pub account_id: AccountId,
    pub first_trajectory_id: TrajectoryId,
    pub touch_count: u64,
    pub trajectory_count: u64,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
}

/// One walk: an ordered event log produced by a single chat turn.
///
/// Open (mutable via `log_event`) until `complete_trajectory` sets
/// `completed_at`; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub id: TrajectoryId,
    pub account_id: AccountId,
    pub conversation_id: Option<ConversationId>,
    pub input_text: String,
    /// Cheap, collision-tolerant fingerprint of `input_text`. Not a
    /// cryptographic hash and not guaranteed stable across engine
    /// versions — see `hash::fnv1a_32`.
    pub input_hash: u32,
    pub summary: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Trajectory {
    pub fn is_open(&self) -> bool {
        self.completed_at.is_none()
    }
}

/// A touch/discover/reason/decide/simulate record within a trajectory.
///
/// Append-only; `sequence_num` is zero-based, gapless, and strictly
/// increasing for a given `trajectory_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub trajectory_id: TrajectoryId,
    pub sequence_num: u64,
    pub timestamp: Timestamp,
    pub event_type: EventType,
    pub entity_id: Option<EntityId>,
    /// Opaque, UI-advisory payload. Decision-context cues extracted by
    /// the tag parser are nested under a `_context` key; the graph
    /// engine never reads `data` back out.
    pub data: Option<serde_json::Value>,
}

/// A directed, weighted relation between two entities.
///
/// Keyed by the ordered pair `(source_id, target_id)` — no
/// canonicalization, so `(a, b)` and `(b, a)` are distinct rows.
/// Self-loops (`source_id == target_id`) are never created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: EntityId,
    pub target_id: EntityId,
    pub weight: u64,
    pub trajectory_count: u64,
    pub contributor_count: u64,
    /// `Some("leads_to")` for strategy->outcome edges written by
    /// `complete_trajectory`'s outcome-edge step; `None` otherwise.
    pub relationship_type: Option<String>,
    /// Reserved extension points: the schema carries these counters so
    /// a future valence-classification pass has somewhere to write,
    /// but the core never increments them.
    pub positive_outcomes: u64,
    pub negative_outcomes: u64,
    pub mixed_outcomes: u64,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
}

impl Edge {
    pub fn key(source_id: EntityId, target_id: EntityId) -> String {
        format!("{}:{}", source_id, target_id)
    }
}

/// An undirected pair count: how often two entities appeared together
/// in the same trajectory walk.
///
/// Keyed by the canonical `(min(a, b), max(a, b))` ordering, so
/// `cooccurrence(a, b)` and `cooccurrence(b, a)` are the same row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cooccurrence {
    pub entity_a: EntityId,
    pub entity_b: EntityId,
    pub count: u64,
    pub window_count: u64,
    pub trajectory_count: u64,
    pub contributor_count: u64,
    pub last_updated: Timestamp,
}

impl Cooccurrence {
    /// Canonical key for the pair, independent of argument order.
    pub fn key(a: EntityId, b: EntityId) -> String {
        let (lo, hi) = canonical_pair(a, b);
        format!("{}:{}", lo, hi)
    }
}

/// Sorts two entity ids so the lexicographically smaller comes first,
/// matching the co-occurrence key rule in `Cooccurrence::key`.
pub fn canonical_pair(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a.to_string() <= b.to_string() {
        (a, b)
    } else {
        (b, a)
    }
}

/// A thin conversation container; ordering of its messages is by
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub account_id: AccountId,
    pub title: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One message within a `Conversation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: MessageRole,
    pub content: String,
    pub trajectory_id: Option<TrajectoryId>,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn canonical_pair_is_order_independent() {
        let a = EntityId::new(Uuid::from_u128(1));
        let b = EntityId::new(Uuid::from_u128(2));
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
    }

    #[test]
    fn cooccurrence_key_is_symmetric() {
        let a = EntityId::new(Uuid::from_u128(10));
        let b = EntityId::new(Uuid::from_u128(20));
        assert_eq!(Cooccurrence::key(a, b), Cooccurrence::key(b, a));
    }

    #[test]
    fn edge_key_is_directional() {
        let a = EntityId::new(Uuid::from_u128(1));
        let b = EntityId::new(Uuid::from_u128(2));
        assert_ne!(Edge::key(a, b), Edge::key(b, a));
    }
}
