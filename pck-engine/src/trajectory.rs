//! `TrajectoryEngine`: owns the per-trajectory sequence counter and the
//! find-or-create-entity / log-event operations that run mid-walk.

use chrono::Utc;
use pck_core::*;
use pck_storage::{EntityPatch, Store};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Input to `TrajectoryEngine::log_event`.
///
/// `context` is folded into `data._context` if both are present; if
/// only `context` is given, `data` becomes `{"_context": context}`.
#[derive(Debug, Clone)]
pub struct LogEventInput {
    pub event_type: EventType,
    pub entity_id: Option<EntityId>,
    pub data: Option<serde_json::Value>,
    pub context: Option<serde_json::Value>,
}

impl Default for LogEventInput {
    /// `event_type` defaults to `Touch`; callers that need another
    /// kind (e.g. `reason`/`decide`) always set it explicitly, so the
    /// placeholder here is never observed.
    fn default() -> Self {
        Self {
            event_type: EventType::Touch,
            entity_id: None,
            data: None,
            context: None,
        }
    }
}

impl LogEventInput {
    pub fn touch(entity_id: EntityId) -> Self {
        Self {
            event_type: EventType::Touch,
            entity_id: Some(entity_id),
            ..Default::default()
        }
    }

    pub fn discover(entity_id: EntityId) -> Self {
        Self {
            event_type: EventType::Discover,
            entity_id: Some(entity_id),
            ..Default::default()
        }
    }
}

/// Lifecycle of a single walk: `start` → `log_event`* →
/// `find_or_create_entity`* → `complete`.
///
/// The per-trajectory sequence counter is owned here, in memory, per
/// §5's single-writer rule: no other code path may append events for
/// a trajectory this engine has started. The counter is discarded once
/// the trajectory completes.
pub struct TrajectoryEngine {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) sequence_counters: Mutex<HashMap<TrajectoryId, u64>>,
}

impl TrajectoryEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            sequence_counters: Mutex::new(HashMap::new()),
        }
    }

    /// Writes a trajectory row with `input_hash` computed from
    /// `input_text`, and opens its in-memory sequence counter at 0.
    pub fn start_trajectory(
        &self,
        account_id: AccountId,
        input_text: impl Into<String>,
        conversation_id: Option<ConversationId>,
    ) -> Result<TrajectoryId, EngineError> {
        let input_text = input_text.into();
        let now = Utc::now();
        let trajectory = Trajectory {
            id: TrajectoryId::now_v7(),
            account_id,
            conversation_id,
            input_hash: fnv1a_32(&input_text),
            input_text,
            summary: None,
            started_at: now,
            completed_at: None,
        };
        self.store.insert_trajectory(trajectory.clone())?;
        self.sequence_counters
            .lock()
            .expect("sequence counter lock poisoned")
            .insert(trajectory.id, 0);
        Ok(trajectory.id)
    }

    /// Appends an event with the next gapless `sequence_num` for
    /// `trajectory_id`. For `touch` events with an `entity_id`, also
    /// bumps that entity's `touch_count`/`last_seen`.
    pub fn log_event(
        &self,
        trajectory_id: TrajectoryId,
        input: LogEventInput,
    ) -> Result<EventId, EngineError> {
        let now = Utc::now();
        let data = merge_context(input.data, input.context);
        let sequence_num = self.next_sequence(trajectory_id)?;

        let event = Event {
            id: EventId::now_v7(),
            trajectory_id,
            sequence_num,
            timestamp: now,
            event_type: input.event_type,
            entity_id: input.entity_id,
            data,
        };
        self.store.insert_event(event.clone())?;

        if event.event_type == EventType::Touch {
            if let Some(entity_id) = event.entity_id {
                self.store.update_entity(
                    entity_id,
                    EntityPatch {
                        touch_count_delta: 1,
                        last_seen: Some(now),
                        ..Default::default()
                    },
                )?;
            }
        }
        Ok(event.id)
    }

    /// Finds or creates the entity named `name`, tracks `account_id`
    /// as one of its contributors, and returns its id.
    ///
    /// `entity_type` and `description` are only adopted if the entity
    /// doesn't already carry one — both are sticky, first-writer-wins
    /// fields on `Entity`. Does not itself touch `touch_count` or
    /// `trajectory_count`: callers always follow this with a
    /// `log_event(touch)` for the same mention, and `complete_trajectory`
    /// derives `trajectory_count` from the event log, so those two are
    /// the sole sources for those counters — this call seeds a fresh
    /// row at zero rather than double-counting the mention that is
    /// about to be logged.
    pub fn find_or_create_entity(
        &self,
        account_id: &AccountId,
        trajectory_id: TrajectoryId,
        name: &str,
        entity_type: Option<EntityType>,
        description: Option<String>,
    ) -> Result<EntityId, EngineError> {
        let normalized_name = name.trim().to_lowercase();
        let display_name = name.trim().to_string();
        let now = Utc::now();

        let new_entity_type = entity_type.clone();
        let new_description = description.clone();
        let new_normalized = normalized_name.clone();

        let entity = self.store.find_or_create_entity(
            &normalized_name,
            Box::new(move || Entity {
                id: EntityId::now_v7(),
                name: display_name,
                normalized_name: new_normalized,
                entity_type: new_entity_type,
                description: new_description,
                touch_count: 0,
                trajectory_count: 0,
                contributor_count: 0,
                first_seen: now,
                last_seen: now,
            }),
            Box::new(move |entity, is_new| {
                if is_new {
                    return;
                }
                if entity.entity_type.is_none() {
                    if let Some(t) = entity_type {
                        entity.entity_type = Some(t);
                    }
                }
                if entity.description.is_none() {
                    if let Some(d) = description {
                        entity.description = Some(d);
                    }
                }
            }),
        )?;

        let is_new_contribution = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&is_new_contribution);
        self.store.find_or_insert_contribution(
            entity.id,
            account_id.clone(),
            trajectory_id,
            now,
            Box::new(move |contribution, is_new| {
                flag.store(is_new, Ordering::SeqCst);
                if is_new {
                    contribution.touch_count = 1;
                } else {
                    contribution.touch_count += 1;
                }
            }),
        )?;

        if is_new_contribution.load(Ordering::SeqCst) {
            self.store.update_entity(
                entity.id,
                EntityPatch {
                    contributor_count_delta: 1,
                    ..Default::default()
                },
            )?;
        }

        Ok(entity.id)
    }

    /// Allocates the next gapless `sequence_num` for `trajectory_id`.
    /// Fails if the trajectory's counter was never opened (unknown
    /// trajectory) or was already discarded (already completed).
    pub(crate) fn next_sequence(&self, trajectory_id: TrajectoryId) -> Result<u64, EngineError> {
        let mut counters = self
            .sequence_counters
            .lock()
            .expect("sequence counter lock poisoned");
        let counter = counters
            .get_mut(&trajectory_id)
            .ok_or_else(|| EngineError::TrajectoryNotFound(trajectory_id.to_string()))?;
        let sequence_num = *counter;
        *counter += 1;
        Ok(sequence_num)
    }
}

fn merge_context(
    data: Option<serde_json::Value>,
    context: Option<serde_json::Value>,
) -> Option<serde_json::Value> {
    let context = match context {
        Some(c) => c,
        None => return data,
    };
    let mut data = data.unwrap_or_else(|| serde_json::json!({}));
    if let serde_json::Value::Object(ref mut map) = data {
        map.insert("_context".to_string(), context);
    }
    Some(data)
}
