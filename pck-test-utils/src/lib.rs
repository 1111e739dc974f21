//! PCK Test Utilities
//!
//! Centralized test infrastructure for the PCK workspace:
//! - Proptest generators for every core entity type
//! - Fixtures for common graph/trajectory scenarios, including a
//!   pre-seeded `InMemoryStore`
//! - Custom assertions for PCK-specific validation

// Re-export storage and LLM types test crates commonly need.
pub use pck_storage::{EntityPatch, InMemoryStore, Store, TrajectoryPatch};

pub use pck_core::{
    AccountId, ConfigError, Conversation, ConversationId, Cooccurrence, Edge, Entity,
    EntityContribution, EntityId, EntityIdType, EntityType, Event, EventId, EventType,
    Message, MessageId, MessageRole, PckConfig, PckError, PckResult, ReasonerError, StoreError,
    Timestamp, Trajectory, TrajectoryId,
};

pub use pck_llm::{ChatMessage, ChatRole, LLMClient, MockLlmClient};

use chrono::Utc;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating PCK entity types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a timestamp-sortable `EntityId`.
    pub fn arb_entity_id() -> impl Strategy<Value = EntityId> {
        arb_uuid().prop_map(EntityId::new)
    }

    /// Generate a `TrajectoryId`.
    pub fn arb_trajectory_id() -> impl Strategy<Value = TrajectoryId> {
        arb_uuid().prop_map(TrajectoryId::new)
    }

    /// Generate an `EventId`.
    pub fn arb_event_id() -> impl Strategy<Value = EventId> {
        arb_uuid().prop_map(EventId::new)
    }

    /// Generate a `ConversationId`.
    pub fn arb_conversation_id() -> impl Strategy<Value = ConversationId> {
        arb_uuid().prop_map(ConversationId::new)
    }

    /// Generate a `MessageId`.
    pub fn arb_message_id() -> impl Strategy<Value = MessageId> {
        arb_uuid().prop_map(MessageId::new)
    }

    /// Generate an opaque `AccountId` from a small alphabet, so
    /// strategies that partition by account actually collide sometimes.
    pub fn arb_account_id() -> impl Strategy<Value = AccountId> {
        "account-[a-z0-9]{4,8}".prop_map(AccountId::new)
    }

    /// Generate a timestamp within a reasonable range (2020-2030).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64)
            .prop_map(|secs| chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now))
    }

    /// Generate one of the entity type words the reasoner special-cases.
    pub fn arb_entity_type() -> impl Strategy<Value = EntityType> {
        prop_oneof![
            Just(EntityType::new(EntityType::TOPIC)),
            Just(EntityType::new(EntityType::MISCONCEPTION)),
            Just(EntityType::new(EntityType::STRATEGY)),
            Just(EntityType::new(EntityType::CONTEXT)),
            Just(EntityType::new(EntityType::CONSTRAINT)),
            Just(EntityType::new(EntityType::OUTCOME)),
            Just(EntityType::new(EntityType::CONCEPT)),
        ]
    }

    /// Generate an `EventType` variant.
    pub fn arb_event_type() -> impl Strategy<Value = EventType> {
        prop_oneof![
            Just(EventType::Touch),
            Just(EventType::Discover),
            Just(EventType::Reason),
            Just(EventType::Decide),
            Just(EventType::Simulate),
        ]
    }

    /// Generate a `MessageRole` variant.
    pub fn arb_message_role() -> impl Strategy<Value = MessageRole> {
        prop_oneof![
            Just(MessageRole::User),
            Just(MessageRole::Assistant),
            Just(MessageRole::System),
        ]
    }

    /// Generate a normalized entity name (lower-case, no surrounding
    /// whitespace), matching how the tag parser normalizes mentions.
    pub fn arb_normalized_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9 ]{2,24}".prop_map(|s| s.trim().to_string())
    }

    /// Generate an `Entity` with internally-consistent counters
    /// (`touch_count >= trajectory_count >= contributor_count >= 1`).
    pub fn arb_entity() -> impl Strategy<Value = Entity> {
        (
            arb_entity_id(),
            arb_normalized_name(),
            prop::option::of(arb_entity_type()),
            1u64..50,
            arb_timestamp(),
        )
            .prop_map(|(id, name, entity_type, extra, first_seen)| {
                let contributor_count = 1;
                let trajectory_count = contributor_count + extra / 3;
                let touch_count = trajectory_count + extra;
                Entity {
                    id,
                    normalized_name: name.clone(),
                    name,
                    entity_type,
                    description: None,
                    touch_count,
                    trajectory_count,
                    contributor_count,
                    first_seen,
                    last_seen: first_seen,
                }
            })
    }

    /// Generate an open (not yet completed) `Trajectory`.
    pub fn arb_open_trajectory() -> impl Strategy<Value = Trajectory> {
        (arb_trajectory_id(), arb_account_id(), "[a-zA-Z0-9 ]{1,80}", arb_timestamp()).prop_map(
            |(id, account_id, input_text, started_at)| Trajectory {
                id,
                account_id,
                conversation_id: None,
                input_hash: pck_core::fnv1a_32(&input_text),
                input_text,
                summary: None,
                started_at,
                completed_at: None,
            },
        )
    }

    /// Generate a directed `Edge`, never a self-loop.
    pub fn arb_edge() -> impl Strategy<Value = Edge> {
        (arb_entity_id(), arb_entity_id(), 1u64..100, arb_timestamp()).prop_filter_map(
            "source and target must differ",
            |(source_id, target_id, weight, seen)| {
                if source_id == target_id {
                    return None;
                }
                Some(Edge {
                    source_id,
                    target_id,
                    weight,
                    trajectory_count: weight,
                    contributor_count: 1,
                    relationship_type: None,
                    positive_outcomes: 0,
                    negative_outcomes: 0,
                    mixed_outcomes: 0,
                    first_seen: seen,
                    last_seen: seen,
                })
            },
        )
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// A stable account id for tests that don't care which one they get.
    pub fn account_id() -> AccountId {
        AccountId::new("test-account")
    }

    /// Build an `Entity` with the given name and type, counters at
    /// their just-created minimum (1/1/1).
    pub fn new_entity(name: &str, entity_type: Option<&str>) -> Entity {
        let now = Utc::now();
        Entity {
            id: EntityId::now_v7(),
            name: name.to_string(),
            normalized_name: name.trim().to_lowercase(),
            entity_type: entity_type.map(EntityType::new),
            description: None,
            touch_count: 1,
            trajectory_count: 1,
            contributor_count: 1,
            first_seen: now,
            last_seen: now,
        }
    }

    /// An open trajectory for `account_id`, started from `input_text`.
    pub fn open_trajectory(account_id: AccountId, input_text: &str) -> Trajectory {
        Trajectory {
            id: TrajectoryId::now_v7(),
            account_id,
            conversation_id: None,
            input_text: input_text.to_string(),
            input_hash: pck_core::fnv1a_32(input_text),
            summary: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// The same trajectory, already completed with a summary.
    pub fn completed_trajectory(account_id: AccountId, input_text: &str) -> Trajectory {
        let mut trajectory = open_trajectory(account_id, input_text);
        trajectory.summary = Some("test summary".to_string());
        trajectory.completed_at = Some(Utc::now());
        trajectory
    }

    /// A `touch` event at `sequence_num` within `trajectory_id`.
    pub fn touch_event(trajectory_id: TrajectoryId, sequence_num: u64, entity_id: EntityId) -> Event {
        Event {
            id: EventId::now_v7(),
            trajectory_id,
            sequence_num,
            timestamp: Utc::now(),
            event_type: EventType::Touch,
            entity_id: Some(entity_id),
            data: None,
        }
    }

    /// A directed edge from `source_id` to `target_id` with `weight`
    /// observations.
    pub fn edge(source_id: EntityId, target_id: EntityId, weight: u64) -> Edge {
        let now = Utc::now();
        Edge {
            source_id,
            target_id,
            weight,
            trajectory_count: weight,
            contributor_count: 1,
            relationship_type: None,
            positive_outcomes: 0,
            negative_outcomes: 0,
            mixed_outcomes: 0,
            first_seen: now,
            last_seen: now,
        }
    }

    /// A co-occurrence row for the canonical `(a, b)` pair.
    pub fn cooccurrence(a: EntityId, b: EntityId, count: u64) -> Cooccurrence {
        let (entity_a, entity_b) = pck_core::canonical_pair(a, b);
        Cooccurrence {
            entity_a,
            entity_b,
            count,
            window_count: count,
            trajectory_count: count,
            contributor_count: 1,
            last_updated: Utc::now(),
        }
    }

    /// A conversation for `account_id` with no messages yet.
    pub fn conversation(account_id: AccountId) -> Conversation {
        let now = Utc::now();
        Conversation {
            id: ConversationId::now_v7(),
            account_id,
            title: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A user or assistant message within `conversation_id`.
    pub fn message(conversation_id: ConversationId, role: MessageRole, content: &str) -> Message {
        Message {
            id: MessageId::now_v7(),
            conversation_id,
            role,
            content: content.to_string(),
            trajectory_id: None,
            created_at: Utc::now(),
        }
    }

    /// An `InMemoryStore` seeded with two entities joined by an edge
    /// and a co-occurrence, plus one completed trajectory that touched
    /// both. Useful for `pck-reasoner`/`pck-query` tests that need a
    /// graph with actual structure without hand-rolling one each time.
    pub fn seeded_store() -> (InMemoryStore, AccountId, EntityId, EntityId) {
        let store = InMemoryStore::new();
        let account_id = account_id();

        let a = new_entity("fractions", Some(EntityType::TOPIC));
        let b = new_entity("number line model", Some(EntityType::STRATEGY));
        let a_id = a.id;
        let b_id = b.id;
        store.insert_entity(a).expect("insert entity a");
        store.insert_entity(b).expect("insert entity b");

        store
            .upsert_edge(a_id, b_id, Box::new(|e| e.weight += 3))
            .expect("upsert edge");
        store
            .upsert_cooccurrence(a_id, b_id, Box::new(|c| c.count += 3))
            .expect("upsert cooccurrence");

        let trajectory = completed_trajectory(account_id.clone(), "teaching fractions");
        store
            .insert_trajectory(trajectory.clone())
            .expect("insert trajectory");
        store
            .insert_event(touch_event(trajectory.id, 0, a_id))
            .expect("insert event a");
        store
            .insert_event(touch_event(trajectory.id, 1, b_id))
            .expect("insert event b");

        (store, account_id, a_id, b_id)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for PCK-specific validation.

    use super::*;

    /// Assert that a `PckResult` is `Ok`.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &PckResult<T>) {
        assert!(result.is_ok(), "expected Ok, got Err: {:?}", result);
    }

    /// Assert that a `PckResult` is `Err`.
    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &PckResult<T>) {
        assert!(result.is_err(), "expected Err, got Ok: {:?}", result);
    }

    /// Assert that a `PckResult` failed with `PckError::Store`.
    #[track_caller]
    pub fn assert_store_error<T: std::fmt::Debug>(result: &PckResult<T>) {
        match result {
            Err(PckError::Store(_)) => {}
            other => panic!("expected Store error, got: {:?}", other),
        }
    }

    /// Assert that a `Result<T, StoreError>` is a `NotFound` for the
    /// given entity name.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(
        result: &Result<T, StoreError>,
        expected_entity: &str,
    ) {
        match result {
            Err(StoreError::NotFound { entity, .. }) => {
                assert_eq!(*entity, expected_entity, "wrong entity name in NotFound error");
            }
            other => panic!("expected NotFound({}), got: {:?}", expected_entity, other),
        }
    }

    /// Assert the invariant `touch_count >= trajectory_count >=
    /// contributor_count >= 1` that every `Entity` must hold for its
    /// lifetime.
    #[track_caller]
    pub fn assert_entity_counters_consistent(entity: &Entity) {
        assert!(
            entity.touch_count >= entity.trajectory_count,
            "touch_count {} < trajectory_count {}",
            entity.touch_count,
            entity.trajectory_count
        );
        assert!(
            entity.trajectory_count >= entity.contributor_count,
            "trajectory_count {} < contributor_count {}",
            entity.trajectory_count,
            entity.contributor_count
        );
        assert!(
            entity.contributor_count >= 1,
            "contributor_count must be at least 1, got {}",
            entity.contributor_count
        );
    }

    /// Assert that a trajectory is still open.
    #[track_caller]
    pub fn assert_trajectory_open(trajectory: &Trajectory) {
        assert!(trajectory.is_open(), "expected trajectory to be open");
        assert!(trajectory.completed_at.is_none());
    }

    /// Assert that a trajectory has been completed.
    #[track_caller]
    pub fn assert_trajectory_completed(trajectory: &Trajectory) {
        assert!(!trajectory.is_open(), "expected trajectory to be completed");
        assert!(trajectory.completed_at.is_some());
    }

    /// Assert that event sequence numbers for a trajectory are
    /// zero-based, gapless and strictly increasing.
    #[track_caller]
    pub fn assert_gapless_sequence(events: &[Event]) {
        for (i, event) in events.iter().enumerate() {
            assert_eq!(
                event.sequence_num, i as u64,
                "event at position {} has sequence_num {}, expected {}",
                i, event.sequence_num, i
            );
        }
    }

    /// Assert that an edge is never a self-loop.
    #[track_caller]
    pub fn assert_not_self_loop(edge: &Edge) {
        assert_ne!(
            edge.source_id, edge.target_id,
            "edge must not be a self-loop"
        );
    }
}
