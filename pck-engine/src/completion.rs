//! `complete_trajectory`: the end-of-walk transaction that updates
//! entity aggregates, provenance, edges, co-occurrences and
//! strategy→outcome edges from a trajectory's event log.

use crate::trajectory::TrajectoryEngine;
use chrono::Utc;
use pck_core::*;
use pck_storage::{EntityPatch, Store, TrajectoryPatch};
use serde::Serialize;
use std::collections::HashSet;

/// Summary returned by `complete_trajectory`, mirrored in the `/chat`
/// and `complete` SSE response shapes.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TrajectoryCompletion {
    pub entities_touched: Vec<EntityId>,
    pub entities_discovered: Vec<EntityId>,
    pub edges_traversed: Vec<(EntityId, EntityId)>,
}

impl TrajectoryEngine {
    /// Completes `trajectory_id`, running the structural graph mutation
    /// described in spec §4.3 exactly once.
    ///
    /// Idempotent under replay: if the trajectory is already completed,
    /// this re-derives the same summary from its (immutable) event log
    /// without incrementing any counter a second time.
    pub fn complete_trajectory(
        &self,
        trajectory_id: TrajectoryId,
        account_id: &AccountId,
        summary: Option<String>,
    ) -> Result<TrajectoryCompletion, EngineError> {
        let trajectory = self
            .store
            .get_trajectory(trajectory_id)?
            .ok_or_else(|| EngineError::TrajectoryNotFound(trajectory_id.to_string()))?;

        if trajectory.completed_at.is_some() {
            let events = self.store.events_for_trajectory(trajectory_id)?;
            return Ok(derive_completion(&events));
        }

        let now = Utc::now();
        self.store.update_trajectory(
            trajectory_id,
            TrajectoryPatch {
                summary,
                completed_at: Some(now),
            },
        )?;

        let events = self.store.events_for_trajectory(trajectory_id)?;
        let completion = derive_completion(&events);
        let all: Vec<EntityId> = completion
            .entities_touched
            .iter()
            .chain(completion.entities_discovered.iter())
            .copied()
            .collect();

        for &id in &all {
            self.store.update_entity(
                id,
                EntityPatch {
                    trajectory_count_delta: 1,
                    ..Default::default()
                },
            )?;
            self.store.find_or_insert_contribution(
                id,
                account_id.clone(),
                trajectory_id,
                now,
                Box::new(|contribution, _is_new| {
                    contribution.trajectory_count += 1;
                }),
            )?;
        }

        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                self.store.upsert_cooccurrence(
                    all[i],
                    all[j],
                    Box::new(|pair| {
                        pair.count += 1;
                        pair.window_count += 1;
                        pair.trajectory_count += 1;
                    }),
                )?;
            }
        }

        for &(source, target) in &completion.edges_traversed {
            self.store.upsert_edge(
                source,
                target,
                Box::new(|edge| {
                    edge.weight += 1;
                    edge.trajectory_count += 1;
                }),
            )?;
        }

        self.write_outcome_edges(&all)?;

        self.sequence_counters
            .lock()
            .expect("sequence counter lock poisoned")
            .remove(&trajectory_id);

        Ok(completion)
    }

    /// For every `(strategy, outcome)` pair within `all`, strengthens a
    /// `relationship_type = "leads_to"` edge — independent of whether
    /// the two were adjacent in touch order.
    fn write_outcome_edges(&self, all: &[EntityId]) -> Result<(), EngineError> {
        let mut strategies = Vec::new();
        let mut outcomes = Vec::new();
        for &id in all {
            if let Some(entity) = self.store.get_entity(id)? {
                match entity.entity_type {
                    Some(t) if t.is_strategy() => strategies.push(id),
                    Some(t) if t.is_outcome() => outcomes.push(id),
                    _ => {}
                }
            }
        }

        for &strategy in &strategies {
            for &outcome in &outcomes {
                self.store.upsert_edge(
                    strategy,
                    outcome,
                    Box::new(|edge| {
                        edge.relationship_type = Some("leads_to".to_string());
                        edge.weight += 1;
                        edge.trajectory_count += 1;
                    }),
                )?;
            }
        }
        Ok(())
    }
}

/// Pure function from an ordered event log to the trajectory's
/// touched/discovered/edges-traversed summary. Used both for a fresh
/// completion and to re-derive the same answer on idempotent replay.
fn derive_completion(events: &[Event]) -> TrajectoryCompletion {
    let mut touched = Vec::new();
    let mut seen_touched = HashSet::new();
    for event in events {
        if event.event_type == EventType::Touch {
            if let Some(id) = event.entity_id {
                if seen_touched.insert(id) {
                    touched.push(id);
                }
            }
        }
    }

    let mut discovered = Vec::new();
    let mut seen_discovered = HashSet::new();
    for event in events {
        if event.event_type == EventType::Discover {
            if let Some(id) = event.entity_id {
                if seen_touched.contains(&id) {
                    continue;
                }
                if seen_discovered.insert(id) {
                    discovered.push(id);
                }
            }
        }
    }

    let edges_traversed: Vec<(EntityId, EntityId)> = touched
        .windows(2)
        .filter(|w| w[0] != w[1])
        .map(|w| (w[0], w[1]))
        .collect();

    TrajectoryCompletion {
        entities_touched: touched,
        entities_discovered: discovered,
        edges_traversed,
    }
}
