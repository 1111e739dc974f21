//! PCK Storage - the `Store` trait and its in-memory reference
//! implementation.
//!
//! `InMemoryStore` is the only backend this workspace defines: one
//! `RwLock`-guarded table set standing in for a database transaction,
//! following the same `Arc<RwLock<HashMap<_, _>>>` shape this
//! lineage's mock storage has always used. Multi-row logical steps
//! (an upsert that may insert-then-mutate in one call) take the write
//! lock for the whole operation, which is the in-memory analogue of a
//! serializable `UPDATE ... SET x = x + 1 WHERE id = ?`.

use chrono::Utc;
use pck_core::*;
use std::collections::HashMap;
use std::sync::RwLock;

// ============================================================================
// PATCH TYPES
// ============================================================================

/// Update payload for `Store::update_entity`.
///
/// `entity_type` and `description` are only applied if the entity does
/// not already have one set — both fields are sticky / first-writer-
/// wins per `Entity`'s own invariant. The counters are *deltas*,
/// applied as `entity.field += delta` inside the same write-lock
/// acquisition that reads the current value — this is what makes
/// concurrent increments lose none of their count, the in-memory
/// analogue of `UPDATE ... SET touch_count = touch_count + 1 WHERE id
/// = ?`. `last_seen`, when given, is applied unconditionally.
#[derive(Debug, Clone, Default)]
pub struct EntityPatch {
    pub entity_type: Option<EntityType>,
    pub description: Option<String>,
    pub touch_count_delta: u64,
    pub trajectory_count_delta: u64,
    pub contributor_count_delta: u64,
    pub last_seen: Option<Timestamp>,
}

/// Update payload for `Store::update_trajectory`.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryPatch {
    pub summary: Option<String>,
    pub completed_at: Option<Timestamp>,
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Persistence abstraction for the graph engine.
///
/// Object-safe by design (`Arc<dyn Store>` is how every other crate
/// holds one), so mutator closures are boxed rather than generic.
pub trait Store: Send + Sync {
    // --- Entities ---

    fn find_entity_by_normalized_name(
        &self,
        normalized_name: &str,
    ) -> Result<Option<Entity>, StoreError>;

    fn insert_entity(&self, entity: Entity) -> Result<(), StoreError>;

    /// Atomic find-or-create on `normalized_name`: looks the row up
    /// under the same write-lock acquisition used to insert it, so
    /// concurrent callers for the same name can never mint two rows.
    /// `make_new` is called only when no row exists yet; `mutator` then
    /// runs against the row either way, told whether it was just
    /// created.
    fn find_or_create_entity(
        &self,
        normalized_name: &str,
        make_new: Box<dyn FnOnce() -> Entity + Send>,
        mutator: Box<dyn FnOnce(&mut Entity, bool) + Send>,
    ) -> Result<Entity, StoreError>;

    fn get_entity(&self, id: EntityId) -> Result<Option<Entity>, StoreError>;

    fn update_entity(&self, id: EntityId, patch: EntityPatch) -> Result<Entity, StoreError>;

    fn entities_for_account(&self, account_id: &AccountId) -> Result<Vec<Entity>, StoreError>;

    // --- Edges & co-occurrences ---

    /// Fetches or default-inserts the edge keyed `(source_id,
    /// target_id)`, then runs `mutator` against it under the same
    /// write-lock acquisition, and returns the edge as it stands after
    /// the mutation.
    fn upsert_edge(
        &self,
        source_id: EntityId,
        target_id: EntityId,
        mutator: Box<dyn FnOnce(&mut Edge) + Send>,
    ) -> Result<Edge, StoreError>;

    fn upsert_cooccurrence(
        &self,
        a: EntityId,
        b: EntityId,
        mutator: Box<dyn FnOnce(&mut Cooccurrence) + Send>,
    ) -> Result<Cooccurrence, StoreError>;

    // --- Contributions ---

    /// Fetches or default-inserts the `(entity_id, account_id)`
    /// contribution row, then runs `mutator` (passed whether the row
    /// was newly created) under the same write-lock acquisition.
    fn find_or_insert_contribution(
        &self,
        entity_id: EntityId,
        account_id: AccountId,
        trajectory_id: TrajectoryId,
        now: Timestamp,
        mutator: Box<dyn FnOnce(&mut EntityContribution, bool) + Send>,
    ) -> Result<EntityContribution, StoreError>;

    // --- Events ---

    /// Fails with `StoreError::TrajectoryClosed` if the parent
    /// trajectory already has a `completed_at`.
    fn insert_event(&self, event: Event) -> Result<(), StoreError>;

    fn events_for_trajectory(&self, trajectory_id: TrajectoryId) -> Result<Vec<Event>, StoreError>;

    // --- Trajectories ---

    fn insert_trajectory(&self, trajectory: Trajectory) -> Result<(), StoreError>;

    fn update_trajectory(
        &self,
        id: TrajectoryId,
        patch: TrajectoryPatch,
    ) -> Result<Trajectory, StoreError>;

    fn get_trajectory(&self, id: TrajectoryId) -> Result<Option<Trajectory>, StoreError>;

    fn trajectories_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Trajectory>, StoreError>;

    // --- Conversations & messages ---

    fn insert_conversation(&self, conversation: Conversation) -> Result<(), StoreError>;

    fn get_conversation(&self, id: ConversationId) -> Result<Option<Conversation>, StoreError>;

    fn conversations_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Conversation>, StoreError>;

    fn insert_message(&self, message: Message) -> Result<(), StoreError>;

    fn messages_for_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, StoreError>;

    // --- Structural reads (GraphReasoner / GraphQuery) ---

    /// Entities whose `normalized_name` contains `needle`, optionally
    /// constrained to `entity_type`, ordered by `touch_count` desc.
    /// Backs `GraphReasoner::resolve`'s partial-match fallback.
    fn find_entities_by_substring(
        &self,
        needle: &str,
        entity_type: Option<&EntityType>,
    ) -> Result<Vec<Entity>, StoreError>;

    fn get_edge(&self, source_id: EntityId, target_id: EntityId) -> Result<Option<Edge>, StoreError>;

    /// All edges with `source_id` as their source.
    fn edges_from(&self, source_id: EntityId) -> Result<Vec<Edge>, StoreError>;

    /// All edges with `target_id` as their target.
    fn edges_to(&self, target_id: EntityId) -> Result<Vec<Edge>, StoreError>;

    /// Edges whose source or target lies in `ids`, de-duplicated.
    fn edges_among(&self, ids: &[EntityId]) -> Result<Vec<Edge>, StoreError>;

    /// Co-occurrence rows involving `entity_id`, in either slot.
    fn cooccurrences_for(&self, entity_id: EntityId) -> Result<Vec<Cooccurrence>, StoreError>;

    /// Ids of `account_id`'s trajectories that logged at least one
    /// event referencing `entity_id`, most recently started first.
    fn trajectory_ids_touching_entity(
        &self,
        account_id: &AccountId,
        entity_id: EntityId,
    ) -> Result<Vec<TrajectoryId>, StoreError>;
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Default)]
struct Inner {
    entities: HashMap<EntityId, Entity>,
    normalized_name_index: HashMap<String, EntityId>,
    contributions: HashMap<(EntityId, AccountId), EntityContribution>,
    edges: HashMap<String, Edge>,
    cooccurrences: HashMap<String, Cooccurrence>,
    events: HashMap<TrajectoryId, Vec<Event>>,
    trajectories: HashMap<TrajectoryId, Trajectory>,
    trajectories_by_account: HashMap<AccountId, Vec<TrajectoryId>>,
    conversations: HashMap<ConversationId, Conversation>,
    conversations_by_account: HashMap<AccountId, Vec<ConversationId>>,
    messages: HashMap<ConversationId, Vec<Message>>,
}

/// Reference `Store` implementation: one `RwLock<Inner>`, no
/// persistence beyond the process lifetime.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Store for InMemoryStore {
    fn find_entity_by_normalized_name(
        &self,
        normalized_name: &str,
    ) -> Result<Option<Entity>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .normalized_name_index
            .get(normalized_name)
            .and_then(|id| inner.entities.get(id))
            .cloned())
    }

    fn insert_entity(&self, entity: Entity) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if inner.entities.contains_key(&entity.id) {
            return Err(StoreError::AlreadyExists {
                entity: "entity",
                id: entity.id.to_string(),
            });
        }
        inner
            .normalized_name_index
            .insert(entity.normalized_name.clone(), entity.id);
        inner.entities.insert(entity.id, entity);
        Ok(())
    }

    fn find_or_create_entity(
        &self,
        normalized_name: &str,
        make_new: Box<dyn FnOnce() -> Entity + Send>,
        mutator: Box<dyn FnOnce(&mut Entity, bool) + Send>,
    ) -> Result<Entity, StoreError> {
        let mut inner = self.write()?;
        let existing = inner.normalized_name_index.get(normalized_name).copied();
        let (id, is_new) = match existing {
            Some(id) => (id, false),
            None => {
                let entity = make_new();
                let id = entity.id;
                inner
                    .normalized_name_index
                    .insert(entity.normalized_name.clone(), id);
                inner.entities.insert(id, entity);
                (id, true)
            }
        };
        let entity = inner.entities.get_mut(&id).expect("just inserted or found");
        mutator(entity, is_new);
        Ok(entity.clone())
    }

    fn get_entity(&self, id: EntityId) -> Result<Option<Entity>, StoreError> {
        Ok(self.read()?.entities.get(&id).cloned())
    }

    fn update_entity(&self, id: EntityId, patch: EntityPatch) -> Result<Entity, StoreError> {
        let mut inner = self.write()?;
        let entity = inner
            .entities
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "entity",
                id: id.to_string(),
            })?;

        if entity.entity_type.is_none() {
            if let Some(t) = patch.entity_type {
                entity.entity_type = Some(t);
            }
        }
        if entity.description.is_none() {
            if let Some(d) = patch.description {
                entity.description = Some(d);
            }
        }
        entity.touch_count += patch.touch_count_delta;
        entity.trajectory_count += patch.trajectory_count_delta;
        entity.contributor_count += patch.contributor_count_delta;
        if let Some(v) = patch.last_seen {
            entity.last_seen = v;
        }
        Ok(entity.clone())
    }

    fn entities_for_account(&self, account_id: &AccountId) -> Result<Vec<Entity>, StoreError> {
        let inner = self.read()?;
        let ids: std::collections::HashSet<EntityId> = inner
            .contributions
            .keys()
            .filter(|(_, acct)| acct == account_id)
            .map(|(entity_id, _)| *entity_id)
            .collect();
        Ok(ids
            .into_iter()
            .filter_map(|id| inner.entities.get(&id).cloned())
            .collect())
    }

    fn upsert_edge(
        &self,
        source_id: EntityId,
        target_id: EntityId,
        mutator: Box<dyn FnOnce(&mut Edge) + Send>,
    ) -> Result<Edge, StoreError> {
        let mut inner = self.write()?;
        let now = Utc::now();
        let key = Edge::key(source_id, target_id);
        let edge = inner.edges.entry(key).or_insert_with(|| Edge {
            source_id,
            target_id,
            weight: 0,
            trajectory_count: 0,
            contributor_count: 0,
            relationship_type: None,
            positive_outcomes: 0,
            negative_outcomes: 0,
            mixed_outcomes: 0,
            first_seen: now,
            last_seen: now,
        });
        mutator(edge);
        edge.last_seen = now;
        Ok(edge.clone())
    }

    fn upsert_cooccurrence(
        &self,
        a: EntityId,
        b: EntityId,
        mutator: Box<dyn FnOnce(&mut Cooccurrence) + Send>,
    ) -> Result<Cooccurrence, StoreError> {
        let mut inner = self.write()?;
        let now = Utc::now();
        let (lo, hi) = canonical_pair(a, b);
        let key = Cooccurrence::key(a, b);
        let pair = inner.cooccurrences.entry(key).or_insert_with(|| Cooccurrence {
            entity_a: lo,
            entity_b: hi,
            count: 0,
            window_count: 0,
            trajectory_count: 0,
            contributor_count: 0,
            last_updated: now,
        });
        mutator(pair);
        pair.last_updated = now;
        Ok(pair.clone())
    }

    fn find_or_insert_contribution(
        &self,
        entity_id: EntityId,
        account_id: AccountId,
        trajectory_id: TrajectoryId,
        now: Timestamp,
        mutator: Box<dyn FnOnce(&mut EntityContribution, bool) + Send>,
    ) -> Result<EntityContribution, StoreError> {
        let mut inner = self.write()?;
        let key = (entity_id, account_id.clone());
        let is_new = !inner.contributions.contains_key(&key);
        let contribution = inner.contributions.entry(key).or_insert_with(|| EntityContribution {
            entity_id,
            account_id,
            first_trajectory_id: trajectory_id,
            touch_count: 0,
            trajectory_count: 0,
            first_seen: now,
            last_seen: now,
        });
        mutator(contribution, is_new);
        contribution.last_seen = now;
        Ok(contribution.clone())
    }

    fn insert_event(&self, event: Event) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let trajectory = inner
            .trajectories
            .get(&event.trajectory_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "trajectory",
                id: event.trajectory_id.to_string(),
            })?;
        if trajectory.completed_at.is_some() {
            return Err(StoreError::TrajectoryClosed {
                trajectory_id: event.trajectory_id.to_string(),
            });
        }
        inner
            .events
            .entry(event.trajectory_id)
            .or_default()
            .push(event);
        Ok(())
    }

    fn events_for_trajectory(&self, trajectory_id: TrajectoryId) -> Result<Vec<Event>, StoreError> {
        let inner = self.read()?;
        let mut events = inner.events.get(&trajectory_id).cloned().unwrap_or_default();
        events.sort_by_key(|e| e.sequence_num);
        Ok(events)
    }

    fn insert_trajectory(&self, trajectory: Trajectory) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if inner.trajectories.contains_key(&trajectory.id) {
            return Err(StoreError::AlreadyExists {
                entity: "trajectory",
                id: trajectory.id.to_string(),
            });
        }
        inner
            .trajectories_by_account
            .entry(trajectory.account_id.clone())
            .or_default()
            .push(trajectory.id);
        inner.trajectories.insert(trajectory.id, trajectory);
        Ok(())
    }

    fn update_trajectory(
        &self,
        id: TrajectoryId,
        patch: TrajectoryPatch,
    ) -> Result<Trajectory, StoreError> {
        let mut inner = self.write()?;
        let trajectory = inner
            .trajectories
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "trajectory",
                id: id.to_string(),
            })?;
        if let Some(summary) = patch.summary {
            trajectory.summary = Some(summary);
        }
        if let Some(completed_at) = patch.completed_at {
            trajectory.completed_at = Some(completed_at);
        }
        Ok(trajectory.clone())
    }

    fn get_trajectory(&self, id: TrajectoryId) -> Result<Option<Trajectory>, StoreError> {
        Ok(self.read()?.trajectories.get(&id).cloned())
    }

    fn trajectories_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Trajectory>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .trajectories_by_account
            .get(account_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.trajectories.get(id).cloned())
            .collect())
    }

    fn insert_conversation(&self, conversation: Conversation) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if inner.conversations.contains_key(&conversation.id) {
            return Err(StoreError::AlreadyExists {
                entity: "conversation",
                id: conversation.id.to_string(),
            });
        }
        inner
            .conversations_by_account
            .entry(conversation.account_id.clone())
            .or_default()
            .push(conversation.id);
        inner.conversations.insert(conversation.id, conversation);
        Ok(())
    }

    fn get_conversation(&self, id: ConversationId) -> Result<Option<Conversation>, StoreError> {
        Ok(self.read()?.conversations.get(&id).cloned())
    }

    fn conversations_for_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<Conversation>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .conversations_by_account
            .get(account_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.conversations.get(id).cloned())
            .collect())
    }

    fn insert_message(&self, message: Message) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner
            .messages
            .entry(message.conversation_id)
            .or_default()
            .push(message);
        Ok(())
    }

    fn messages_for_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, StoreError> {
        let inner = self.read()?;
        let mut messages = inner
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    fn find_entities_by_substring(
        &self,
        needle: &str,
        entity_type: Option<&EntityType>,
    ) -> Result<Vec<Entity>, StoreError> {
        let inner = self.read()?;
        let needle = needle.to_lowercase();
        let mut matches: Vec<Entity> = inner
            .entities
            .values()
            .filter(|e| e.normalized_name.contains(&needle))
            .filter(|e| match entity_type {
                Some(t) => e.entity_type.as_ref() == Some(t),
                None => true,
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.touch_count.cmp(&a.touch_count));
        Ok(matches)
    }

    fn get_edge(&self, source_id: EntityId, target_id: EntityId) -> Result<Option<Edge>, StoreError> {
        let inner = self.read()?;
        Ok(inner.edges.get(&Edge::key(source_id, target_id)).cloned())
    }

    fn edges_from(&self, source_id: EntityId) -> Result<Vec<Edge>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .edges
            .values()
            .filter(|e| e.source_id == source_id)
            .cloned()
            .collect())
    }

    fn edges_to(&self, target_id: EntityId) -> Result<Vec<Edge>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .edges
            .values()
            .filter(|e| e.target_id == target_id)
            .cloned()
            .collect())
    }

    fn edges_among(&self, ids: &[EntityId]) -> Result<Vec<Edge>, StoreError> {
        let inner = self.read()?;
        let set: std::collections::HashSet<EntityId> = ids.iter().copied().collect();
        Ok(inner
            .edges
            .values()
            .filter(|e| set.contains(&e.source_id) && set.contains(&e.target_id))
            .cloned()
            .collect())
    }

    fn cooccurrences_for(&self, entity_id: EntityId) -> Result<Vec<Cooccurrence>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .cooccurrences
            .values()
            .filter(|c| c.entity_a == entity_id || c.entity_b == entity_id)
            .cloned()
            .collect())
    }

    fn trajectory_ids_touching_entity(
        &self,
        account_id: &AccountId,
        entity_id: EntityId,
    ) -> Result<Vec<TrajectoryId>, StoreError> {
        let inner = self.read()?;
        let mut matches: Vec<Trajectory> = inner
            .trajectories_by_account
            .get(account_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.trajectories.get(id))
            .filter(|t| {
                inner
                    .events
                    .get(&t.id)
                    .is_some_and(|events| events.iter().any(|e| e.entity_id == Some(entity_id)))
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(matches.into_iter().map(|t| t.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn make_entity(name: &str) -> Entity {
        let now = Utc::now();
        Entity {
            id: EntityId::new_v4(),
            name: name.to_string(),
            normalized_name: name.to_lowercase(),
            entity_type: None,
            description: None,
            touch_count: 0,
            trajectory_count: 0,
            contributor_count: 0,
            first_seen: now,
            last_seen: now,
        }
    }

    fn make_trajectory(account_id: &str) -> Trajectory {
        let now = Utc::now();
        Trajectory {
            id: TrajectoryId::new_v4(),
            account_id: AccountId::new(account_id),
            conversation_id: None,
            input_text: "teaching fractions".to_string(),
            input_hash: fnv1a_32("teaching fractions"),
            summary: None,
            started_at: now,
            completed_at: None,
        }
    }

    #[test]
    fn insert_then_get_entity_roundtrips() {
        let store = InMemoryStore::new();
        let entity = make_entity("Fractions");
        store.insert_entity(entity.clone()).unwrap();

        let found = store.get_entity(entity.id).unwrap();
        assert_eq!(found.unwrap().id, entity.id);
    }

    #[test]
    fn duplicate_entity_insert_fails() {
        let store = InMemoryStore::new();
        let entity = make_entity("Fractions");
        store.insert_entity(entity.clone()).unwrap();
        assert!(store.insert_entity(entity).is_err());
    }

    #[test]
    fn find_by_normalized_name_reflects_index() {
        let store = InMemoryStore::new();
        let entity = make_entity("Number Line");
        store.insert_entity(entity.clone()).unwrap();

        let found = store.find_entity_by_normalized_name("number line").unwrap();
        assert_eq!(found.unwrap().id, entity.id);
        assert!(store
            .find_entity_by_normalized_name("nope")
            .unwrap()
            .is_none());
    }

    #[test]
    fn entity_type_is_sticky_once_set() {
        let store = InMemoryStore::new();
        let entity = make_entity("Fractions");
        store.insert_entity(entity.clone()).unwrap();

        store
            .update_entity(
                entity.id,
                EntityPatch {
                    entity_type: Some(EntityType::topic()),
                    ..Default::default()
                },
            )
            .unwrap();
        let updated = store
            .update_entity(
                entity.id,
                EntityPatch {
                    entity_type: Some(EntityType::new(EntityType::STRATEGY)),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.entity_type, Some(EntityType::topic()));
    }

    #[test]
    fn find_or_create_entity_mints_exactly_one_row_per_normalized_name() {
        let store = InMemoryStore::new();
        let make = |n: &'static str| {
            let n = n.to_string();
            Box::new(move || make_entity(&n)) as Box<dyn FnOnce() -> Entity + Send>
        };

        let first = store
            .find_or_create_entity("fractions", make("Fractions"), Box::new(|_, _| {}))
            .unwrap();
        let second = store
            .find_or_create_entity("fractions", make("Fractions"), Box::new(|_, _| {}))
            .unwrap();

        assert_eq!(first.id, second.id);
    }

    #[test]
    fn find_or_create_entity_reports_is_new_once() {
        let store = InMemoryStore::new();
        let mut seen_new = Vec::new();
        store
            .find_or_create_entity(
                "fractions",
                Box::new(|| make_entity("Fractions")),
                Box::new(|_, is_new| seen_new.push(is_new)),
            )
            .unwrap();
        store
            .find_or_create_entity(
                "fractions",
                Box::new(|| make_entity("Fractions")),
                Box::new(|_, is_new| seen_new.push(is_new)),
            )
            .unwrap();
        assert_eq!(seen_new, vec![true, false]);
    }

    #[test]
    fn upsert_edge_creates_then_mutates_in_one_call() {
        let store = InMemoryStore::new();
        let a = EntityId::new_v4();
        let b = EntityId::new_v4();

        let edge = store
            .upsert_edge(
                a,
                b,
                Box::new(|e| {
                    e.weight += 1;
                    e.trajectory_count += 1;
                }),
            )
            .unwrap();
        assert_eq!(edge.weight, 1);

        let edge = store
            .upsert_edge(a, b, Box::new(|e| e.weight += 1))
            .unwrap();
        assert_eq!(edge.weight, 2);
    }

    #[test]
    fn cooccurrence_key_is_order_independent_through_store() {
        let store = InMemoryStore::new();
        let a = EntityId::new(Uuid::from_u128(1));
        let b = EntityId::new(Uuid::from_u128(2));

        store
            .upsert_cooccurrence(a, b, Box::new(|c| c.count += 1))
            .unwrap();
        let pair = store
            .upsert_cooccurrence(b, a, Box::new(|c| c.count += 1))
            .unwrap();

        assert_eq!(pair.count, 2);
    }

    #[test]
    fn find_or_insert_contribution_reports_is_new_once() {
        let store = InMemoryStore::new();
        let entity_id = EntityId::new_v4();
        let account_id = AccountId::new("acct-1");
        let trajectory_id = TrajectoryId::new_v4();
        let now = Utc::now();

        let mut seen_new = Vec::new();
        store
            .find_or_insert_contribution(
                entity_id,
                account_id.clone(),
                trajectory_id,
                now,
                Box::new(|_, is_new| seen_new.push(is_new)),
            )
            .unwrap();
        store
            .find_or_insert_contribution(
                entity_id,
                account_id,
                trajectory_id,
                now,
                Box::new(|_, is_new| seen_new.push(is_new)),
            )
            .unwrap();

        assert_eq!(seen_new, vec![true, false]);
    }

    #[test]
    fn insert_event_rejects_completed_trajectory() {
        let store = InMemoryStore::new();
        let trajectory = make_trajectory("acct-1");
        store.insert_trajectory(trajectory.clone()).unwrap();
        store
            .update_trajectory(
                trajectory.id,
                TrajectoryPatch {
                    completed_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .unwrap();

        let event = Event {
            id: EventId::new_v4(),
            trajectory_id: trajectory.id,
            sequence_num: 0,
            timestamp: Utc::now(),
            event_type: EventType::Touch,
            entity_id: None,
            data: None,
        };
        let result = store.insert_event(event);
        assert!(matches!(result, Err(StoreError::TrajectoryClosed { .. })));
    }

    #[test]
    fn events_for_trajectory_are_returned_in_sequence_order() {
        let store = InMemoryStore::new();
        let trajectory = make_trajectory("acct-1");
        store.insert_trajectory(trajectory.clone()).unwrap();

        for seq in [2u64, 0, 1] {
            store
                .insert_event(Event {
                    id: EventId::new_v4(),
                    trajectory_id: trajectory.id,
                    sequence_num: seq,
                    timestamp: Utc::now(),
                    event_type: EventType::Touch,
                    entity_id: None,
                    data: None,
                })
                .unwrap();
        }

        let events = store.events_for_trajectory(trajectory.id).unwrap();
        let sequences: Vec<u64> = events.iter().map(|e| e.sequence_num).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn trajectories_for_account_only_returns_that_account() {
        let store = InMemoryStore::new();
        let t1 = make_trajectory("acct-1");
        let t2 = make_trajectory("acct-2");
        store.insert_trajectory(t1.clone()).unwrap();
        store.insert_trajectory(t2).unwrap();

        let found = store
            .trajectories_for_account(&AccountId::new("acct-1"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, t1.id);
    }

    #[test]
    fn messages_for_conversation_are_ordered_by_created_at() {
        let store = InMemoryStore::new();
        let conversation_id = ConversationId::new_v4();
        store
            .insert_conversation(Conversation {
                id: conversation_id,
                account_id: AccountId::new("acct-1"),
                title: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .unwrap();

        let earlier = Utc::now();
        let later = earlier + chrono::Duration::seconds(5);
        store
            .insert_message(Message {
                id: MessageId::new_v4(),
                conversation_id,
                role: MessageRole::Assistant,
                content: "second".to_string(),
                trajectory_id: None,
                created_at: later,
            })
            .unwrap();
        store
            .insert_message(Message {
                id: MessageId::new_v4(),
                conversation_id,
                role: MessageRole::User,
                content: "first".to_string(),
                trajectory_id: None,
                created_at: earlier,
            })
            .unwrap();

        let messages = store.messages_for_conversation(conversation_id).unwrap();
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "second");
    }

    #[test]
    fn find_entities_by_substring_orders_by_touch_count_desc() {
        let store = InMemoryStore::new();
        let mut popular = make_entity("fraction basics");
        popular.touch_count = 10;
        let mut rare = make_entity("fraction drills");
        rare.touch_count = 1;
        store.insert_entity(popular.clone()).unwrap();
        store.insert_entity(rare.clone()).unwrap();

        let matches = store.find_entities_by_substring("fraction", None).unwrap();
        assert_eq!(matches[0].id, popular.id);
        assert_eq!(matches[1].id, rare.id);
    }

    #[test]
    fn find_entities_by_substring_filters_by_type() {
        let store = InMemoryStore::new();
        let mut topic = make_entity("fractions");
        topic.entity_type = Some(EntityType::topic());
        let mut strategy = make_entity("fraction tiles");
        strategy.entity_type = Some(EntityType::new(EntityType::STRATEGY));
        store.insert_entity(topic.clone()).unwrap();
        store.insert_entity(strategy).unwrap();

        let matches = store
            .find_entities_by_substring("fraction", Some(&EntityType::topic()))
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, topic.id);
    }

    #[test]
    fn edges_from_and_to_are_directional() {
        let store = InMemoryStore::new();
        let a = EntityId::new_v4();
        let b = EntityId::new_v4();
        store.upsert_edge(a, b, Box::new(|e| e.weight += 1)).unwrap();

        assert_eq!(store.edges_from(a).unwrap().len(), 1);
        assert_eq!(store.edges_to(b).unwrap().len(), 1);
        assert_eq!(store.edges_from(b).unwrap().len(), 0);
    }

    #[test]
    fn edges_among_only_returns_edges_within_the_set() {
        let store = InMemoryStore::new();
        let a = EntityId::new_v4();
        let b = EntityId::new_v4();
        let c = EntityId::new_v4();
        store.upsert_edge(a, b, Box::new(|e| e.weight += 1)).unwrap();
        store.upsert_edge(b, c, Box::new(|e| e.weight += 1)).unwrap();

        let edges = store.edges_among(&[a, b]).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source_id, a);
    }

    #[test]
    fn trajectory_ids_touching_entity_are_scoped_to_account_and_ordered_recent_first() {
        let store = InMemoryStore::new();
        let entity_id = EntityId::new_v4();
        let account_id = AccountId::new("acct-1");

        let mut earlier = make_trajectory("acct-1");
        earlier.started_at = Utc::now();
        let mut later = make_trajectory("acct-1");
        later.started_at = earlier.started_at + chrono::Duration::seconds(5);
        let unrelated = make_trajectory("acct-1");

        for t in [&earlier, &later, &unrelated] {
            store.insert_trajectory(t.clone()).unwrap();
        }
        for t in [&earlier, &later] {
            store
                .insert_event(Event {
                    id: EventId::new_v4(),
                    trajectory_id: t.id,
                    sequence_num: 0,
                    timestamp: Utc::now(),
                    event_type: EventType::Touch,
                    entity_id: Some(entity_id),
                    data: None,
                })
                .unwrap();
        }

        let ids = store
            .trajectory_ids_touching_entity(&account_id, entity_id)
            .unwrap();
        assert_eq!(ids, vec![later.id, earlier.id]);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Getting a never-inserted entity always returns `Ok(None)`,
        /// never an error.
        #[test]
        fn prop_missing_entity_returns_none(seed in any::<u128>()) {
            let store = InMemoryStore::new();
            let id = EntityId::new(Uuid::from_u128(seed));
            let result = store.get_entity(id).unwrap();
            prop_assert!(result.is_none());
        }

        /// Repeated `upsert_edge` calls accumulate weight monotonically
        /// and never create a second row for the same ordered pair.
        #[test]
        fn prop_upsert_edge_is_monotonic(bumps in 1usize..20) {
            let store = InMemoryStore::new();
            let a = EntityId::new(Uuid::from_u128(1));
            let b = EntityId::new(Uuid::from_u128(2));

            let mut last_weight = 0u64;
            for _ in 0..bumps {
                let edge = store.upsert_edge(a, b, Box::new(|e| e.weight += 1)).unwrap();
                prop_assert!(edge.weight > last_weight);
                last_weight = edge.weight;
            }
            prop_assert_eq!(last_weight, bumps as u64);
        }

        /// Cooccurrence rows are keyed symmetrically regardless of
        /// argument order.
        #[test]
        fn prop_cooccurrence_upsert_is_symmetric(x in 1u128..1000, y in 1u128..1000) {
            prop_assume!(x != y);
            let store = InMemoryStore::new();
            let a = EntityId::new(Uuid::from_u128(x));
            let b = EntityId::new(Uuid::from_u128(y));

            store.upsert_cooccurrence(a, b, Box::new(|c| c.count += 1)).unwrap();
            let pair = store.upsert_cooccurrence(b, a, Box::new(|c| c.count += 1)).unwrap();
            prop_assert_eq!(pair.count, 2);
        }
    }
}
