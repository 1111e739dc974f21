//! Read-only graph queries.
//!
//! `GraphQuery` answers "what does the graph look like" questions —
//! `get_graph` for a neighborhood view (BFS from a center, or an
//! account's own contributed subgraph when no center is given) and
//! `get_entity` for one node's detail view. Like `GraphReasoner`, it
//! never reads trajectory events directly, except for the one
//! per-account check `get_entity` makes via
//! `Store::trajectory_ids_touching_entity`: an entity is global, but
//! its detail view is returned only to an account that has at least
//! one event touching it, and reports as not-found otherwise.

use pck_core::{AccountId, Cooccurrence, Edge, Entity, EntityId, PckConfig, ReasonerError, Trajectory};
use pck_storage::Store;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

pub struct GraphQuery {
    store: Arc<dyn Store>,
    config: PckConfig,
}

/// Input to `get_graph`. `depth` and `min_weight` fall back to
/// `PckConfig`'s defaults when unset.
#[derive(Debug, Clone)]
pub struct GetGraphInput {
    pub account_id: AccountId,
    /// When `Some`, a BFS neighborhood of the global graph rooted here.
    /// When `None`, the account's own contributed subgraph.
    pub center_id: Option<EntityId>,
    pub depth: Option<u32>,
    pub min_weight: Option<u64>,
}

/// A neighborhood of the graph: entities, the edges among them, and
/// the co-occurrence rows among them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphView {
    pub entities: Vec<Entity>,
    pub edges: Vec<Edge>,
    pub cooccurrences: Vec<Cooccurrence>,
}

/// One entity reachable from a queried entity, with whatever relation
/// data connects them (an entity can be both edge-connected and
/// co-occurring, in which case both fields are populated).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectedEntity {
    pub entity: Entity,
    pub edge_weight: Option<u64>,
    pub cooccurrence_count: Option<u64>,
}

/// Full detail view for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub entity: Entity,
    /// Sorted by combined edge weight + co-occurrence count, descending.
    pub connected: Vec<ConnectedEntity>,
    /// At most 5, most recently started first, restricted to
    /// trajectories the querying account itself ran.
    pub recent_trajectories: Vec<Trajectory>,
}

const MAX_RECENT_TRAJECTORIES: usize = 5;

impl GraphQuery {
    pub fn new(store: Arc<dyn Store>, config: PckConfig) -> Self {
        Self { store, config }
    }

    pub fn with_default_config(store: Arc<dyn Store>) -> Self {
        Self::new(store, PckConfig::default())
    }

    pub fn get_graph(&self, input: GetGraphInput) -> Result<GraphView, ReasonerError> {
        let depth = input.depth.unwrap_or(self.config.default_graph_depth);
        let min_weight = input.min_weight.unwrap_or(self.config.default_min_weight);

        match input.center_id {
            Some(center) => self.bfs_from(center, depth, min_weight),
            None => self.account_snapshot(&input.account_id, min_weight),
        }
    }

    pub fn get_entity(
        &self,
        account_id: &AccountId,
        entity_id: EntityId,
    ) -> Result<Option<EntityView>, ReasonerError> {
        let Some(entity) = self.store.get_entity(entity_id)? else {
            return Ok(None);
        };

        let touching_trajectories = self
            .store
            .trajectory_ids_touching_entity(account_id, entity_id)?;
        if touching_trajectories.is_empty() {
            // Per-account read view on the global graph: an account
            // that never touched this entity gets "not found", not a
            // view of someone else's contribution.
            return Ok(None);
        }

        let mut edge_weight: std::collections::HashMap<EntityId, u64> =
            std::collections::HashMap::new();
        for edge in self.store.edges_from(entity_id)? {
            *edge_weight.entry(edge.target_id).or_insert(0) += edge.weight;
        }
        for edge in self.store.edges_to(entity_id)? {
            *edge_weight.entry(edge.source_id).or_insert(0) += edge.weight;
        }

        let mut cooccurrence_count: std::collections::HashMap<EntityId, u64> =
            std::collections::HashMap::new();
        for pair in self.store.cooccurrences_for(entity_id)? {
            let other = if pair.entity_a == entity_id {
                pair.entity_b
            } else {
                pair.entity_a
            };
            cooccurrence_count.insert(other, pair.count);
        }

        let mut ids: Vec<EntityId> = edge_weight
            .keys()
            .chain(cooccurrence_count.keys())
            .copied()
            .collect();
        ids.sort_by_key(|id| id.to_string());
        ids.dedup();

        let mut connected = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(other) = self.store.get_entity(id)? {
                connected.push(ConnectedEntity {
                    entity: other,
                    edge_weight: edge_weight.get(&id).copied(),
                    cooccurrence_count: cooccurrence_count.get(&id).copied(),
                });
            }
        }
        connected.sort_by(|a, b| {
            let a_score = a.edge_weight.unwrap_or(0) + a.cooccurrence_count.unwrap_or(0);
            let b_score = b.edge_weight.unwrap_or(0) + b.cooccurrence_count.unwrap_or(0);
            b_score.cmp(&a_score)
        });

        let mut recent_trajectories = Vec::new();
        for id in touching_trajectories.into_iter().take(MAX_RECENT_TRAJECTORIES) {
            if let Some(trajectory) = self.store.get_trajectory(id)? {
                recent_trajectories.push(trajectory);
            }
        }

        Ok(Some(EntityView {
            entity,
            connected,
            recent_trajectories,
        }))
    }

    fn bfs_from(
        &self,
        center: EntityId,
        depth: u32,
        min_weight: u64,
    ) -> Result<GraphView, ReasonerError> {
        let mut visited: HashSet<EntityId> = HashSet::new();
        visited.insert(center);
        let mut frontier = vec![center];

        for _ in 0..depth {
            if frontier.is_empty() {
                break;
            }
            let mut next_frontier = Vec::new();
            for id in &frontier {
                for edge in self.store.edges_from(*id)? {
                    if edge.weight >= min_weight && visited.insert(edge.target_id) {
                        next_frontier.push(edge.target_id);
                    }
                }
                for edge in self.store.edges_to(*id)? {
                    if edge.weight >= min_weight && visited.insert(edge.source_id) {
                        next_frontier.push(edge.source_id);
                    }
                }
            }
            frontier = next_frontier;
        }

        self.snapshot_for(visited, min_weight)
    }

    fn account_snapshot(
        &self,
        account_id: &AccountId,
        min_weight: u64,
    ) -> Result<GraphView, ReasonerError> {
        let entities = self.store.entities_for_account(account_id)?;
        let ids: HashSet<EntityId> = entities.into_iter().map(|e| e.id).collect();
        self.snapshot_for(ids, min_weight)
    }

    /// Materializes entities, edges and co-occurrences for a set of
    /// ids already decided by the caller (BFS visited set, or an
    /// account's contributed set).
    fn snapshot_for(
        &self,
        ids: HashSet<EntityId>,
        min_weight: u64,
    ) -> Result<GraphView, ReasonerError> {
        let ids: Vec<EntityId> = ids.into_iter().collect();

        let mut entities = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(entity) = self.store.get_entity(*id)? {
                entities.push(entity);
            }
        }

        let edges = self
            .store
            .edges_among(&ids)?
            .into_iter()
            .filter(|e| e.weight >= min_weight)
            .collect();

        let id_set: HashSet<EntityId> = ids.iter().copied().collect();
        let mut cooccurrences = Vec::new();
        let mut seen_keys: HashSet<(EntityId, EntityId)> = HashSet::new();
        for id in &ids {
            for pair in self.store.cooccurrences_for(*id)? {
                let other = if pair.entity_a == *id {
                    pair.entity_b
                } else {
                    pair.entity_a
                };
                if id_set.contains(&other) {
                    let key = (pair.entity_a, pair.entity_b);
                    if seen_keys.insert(key) {
                        cooccurrences.push(pair);
                    }
                }
            }
        }

        Ok(GraphView {
            entities,
            edges,
            cooccurrences,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pck_core::EntityType;
    use pck_storage::InMemoryStore;

    fn make_entity(name: &str) -> Entity {
        let now = Utc::now();
        Entity {
            id: EntityId::new_v4(),
            name: name.to_string(),
            normalized_name: name.to_lowercase(),
            entity_type: Some(EntityType::topic()),
            description: None,
            touch_count: 1,
            trajectory_count: 1,
            contributor_count: 1,
            first_seen: now,
            last_seen: now,
        }
    }

    fn query(store: Arc<InMemoryStore>) -> GraphQuery {
        GraphQuery::new(store, PckConfig::default())
    }

    #[test]
    fn get_entity_returns_none_for_unknown_id() {
        let store = Arc::new(InMemoryStore::new());
        let result = query(store).get_entity(&AccountId::new("acct-1"), EntityId::new_v4());
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn get_entity_ranks_connections_by_combined_strength() {
        use pck_core::{Event, EventId, Trajectory, TrajectoryId};

        let store = Arc::new(InMemoryStore::new());
        let center = make_entity("fractions");
        let strong = make_entity("number lines");
        let weak = make_entity("pie charts");
        for e in [&center, &strong, &weak] {
            store.insert_entity(e.clone()).unwrap();
        }
        store
            .upsert_edge(center.id, strong.id, Box::new(|e| e.weight = 10))
            .unwrap();
        store
            .upsert_edge(center.id, weak.id, Box::new(|e| e.weight = 1))
            .unwrap();

        let account_id = AccountId::new("acct-1");
        let now = Utc::now();
        let trajectory = Trajectory {
            id: TrajectoryId::new_v4(),
            account_id: account_id.clone(),
            conversation_id: None,
            input_text: "x".to_string(),
            input_hash: 0,
            summary: None,
            started_at: now,
            completed_at: None,
        };
        store.insert_trajectory(trajectory.clone()).unwrap();
        store
            .insert_event(Event {
                id: EventId::new_v4(),
                trajectory_id: trajectory.id,
                sequence_num: 0,
                timestamp: now,
                event_type: pck_core::EventType::Touch,
                entity_id: Some(center.id),
                data: None,
            })
            .unwrap();

        let view = query(store)
            .get_entity(&account_id, center.id)
            .unwrap()
            .unwrap();
        assert_eq!(view.connected[0].entity.id, strong.id);
        assert_eq!(view.connected[1].entity.id, weak.id);
    }

    #[test]
    fn get_entity_recent_trajectories_are_scoped_to_account() {
        use pck_core::{Event, EventId, Trajectory, TrajectoryId};

        let store = Arc::new(InMemoryStore::new());
        let entity = make_entity("fractions");
        store.insert_entity(entity.clone()).unwrap();

        let now = Utc::now();
        let trajectory = Trajectory {
            id: TrajectoryId::new_v4(),
            account_id: AccountId::new("acct-1"),
            conversation_id: None,
            input_text: "x".to_string(),
            input_hash: 0,
            summary: None,
            started_at: now,
            completed_at: None,
        };
        store.insert_trajectory(trajectory.clone()).unwrap();
        store
            .insert_event(Event {
                id: EventId::new_v4(),
                trajectory_id: trajectory.id,
                sequence_num: 0,
                timestamp: now,
                event_type: pck_core::EventType::Touch,
                entity_id: Some(entity.id),
                data: None,
            })
            .unwrap();

        let view = query(Arc::clone(&store))
            .get_entity(&AccountId::new("acct-1"), entity.id)
            .unwrap()
            .unwrap();
        assert_eq!(view.recent_trajectories.len(), 1);

        // acct-2 never touched this entity: the per-account read view
        // reports it as not found rather than leaking someone else's
        // contribution with an empty trajectory list.
        let other_account_view = query(store)
            .get_entity(&AccountId::new("acct-2"), entity.id)
            .unwrap();
        assert!(other_account_view.is_none());
    }

    #[test]
    fn bfs_from_center_stays_within_depth() {
        let store = Arc::new(InMemoryStore::new());
        let a = make_entity("a");
        let b = make_entity("b");
        let c = make_entity("c");
        for e in [&a, &b, &c] {
            store.insert_entity(e.clone()).unwrap();
        }
        store.upsert_edge(a.id, b.id, Box::new(|e| e.weight = 1)).unwrap();
        store.upsert_edge(b.id, c.id, Box::new(|e| e.weight = 1)).unwrap();

        let view = query(store)
            .get_graph(GetGraphInput {
                account_id: AccountId::new("acct-1"),
                center_id: Some(a.id),
                depth: Some(1),
                min_weight: None,
            })
            .unwrap();
        let ids: HashSet<EntityId> = view.entities.iter().map(|e| e.id).collect();
        assert!(ids.contains(&a.id));
        assert!(ids.contains(&b.id));
        assert!(!ids.contains(&c.id));
    }

    #[test]
    fn account_scoped_graph_without_center_uses_contributions() {
        let store = Arc::new(InMemoryStore::new());
        let entity = make_entity("fractions");
        store.insert_entity(entity.clone()).unwrap();
        store
            .find_or_insert_contribution(
                entity.id,
                AccountId::new("acct-1"),
                pck_core::TrajectoryId::new_v4(),
                Utc::now(),
                Box::new(|_, _| {}),
            )
            .unwrap();

        let view = query(store)
            .get_graph(GetGraphInput {
                account_id: AccountId::new("acct-1"),
                center_id: None,
                depth: None,
                min_weight: None,
            })
            .unwrap();
        assert_eq!(view.entities.len(), 1);
        assert_eq!(view.entities[0].id, entity.id);
    }
}
