//! `simulate`: projects an outcome distribution and ranks candidate
//! differentiators for a resolved set of entities, purely from edges
//! and co-occurrences already written by `pck-engine`.

use crate::resolve::ResolveInput;
use crate::GraphReasoner;
use pck_core::{Entity, EntityId, EntityType, ReasonerError};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One outcome entity reachable from the resolved set, with the share
/// of observed edge weight it accounts for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeProjection {
    pub entity: Entity,
    pub weight: u64,
    /// `weight` as a fraction of the total weight across every
    /// projected outcome, in `[0.0, 1.0]`.
    pub probability: f64,
    pub positive_count: u64,
    pub negative_count: u64,
    pub mixed_count: u64,
    pub contributor_count: u64,
}

/// Direction a differentiator appears to push outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferentiatorEffect {
    Improves,
    Reduces,
    Mixed,
}

/// A context/constraint/strategy entity that co-occurs with the
/// resolved set and shows a non-trivial skew toward positive or
/// negative outcomes in its own outgoing edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Differentiator {
    pub entity: Entity,
    pub role: EntityType,
    pub effect: DifferentiatorEffect,
    /// `|positive_rate - 0.5|`, always `> differentiator_magnitude_cutoff`.
    pub magnitude: f64,
    /// Co-occurrence count with the resolved set that earned this
    /// candidate its place in the ranking.
    pub cooccurrence_strength: u64,
}

/// Full output of one `simulate` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationResult {
    pub resolved: Vec<Entity>,
    pub unresolved: Vec<String>,
    pub outcomes: Vec<OutcomeProjection>,
    pub differentiators: Vec<Differentiator>,
    /// Sum of `weight` across every projected outcome; the single
    /// number `counterfactual` uses to gate `netEffect = uncertain`.
    pub total_observations: u64,
    /// `true` once either `outcomes` or `differentiators` is non-empty.
    pub has_patterns: bool,
}

#[derive(Default)]
struct MergedOutcome {
    weight: u64,
    positive: u64,
    negative: u64,
    mixed: u64,
    contributors: u64,
}

impl GraphReasoner {
    /// Resolves `inputs`, then projects an outcome distribution and a
    /// ranked differentiator list from the edges and co-occurrences
    /// touching the resolved entities. Never reads trajectory events.
    pub fn simulate(&self, inputs: &[ResolveInput]) -> Result<SimulationResult, ReasonerError> {
        let resolve_result = self.resolve(inputs)?;
        if resolve_result.resolved.is_empty() {
            return Ok(SimulationResult {
                resolved: resolve_result.resolved,
                unresolved: resolve_result.unresolved,
                outcomes: Vec::new(),
                differentiators: Vec::new(),
                total_observations: 0,
                has_patterns: false,
            });
        }

        let resolved_ids: Vec<EntityId> = resolve_result.resolved.iter().map(|e| e.id).collect();
        let outcomes = self.project_outcomes_from_edges(&resolved_ids)?;
        let differentiators = self.find_differentiators_from_structure(&resolved_ids)?;
        let total_observations = outcomes.iter().map(|o| o.weight).sum();
        let has_patterns = !outcomes.is_empty() || !differentiators.is_empty();

        Ok(SimulationResult {
            resolved: resolve_result.resolved,
            unresolved: resolve_result.unresolved,
            outcomes,
            differentiators,
            total_observations,
            has_patterns,
        })
    }

    /// Merges every edge between a resolved entity and an `outcome`
    /// typed entity, in either direction, by outcome entity id; turns
    /// summed weight into a probability relative to the total weight
    /// across all projected outcomes.
    fn project_outcomes_from_edges(
        &self,
        resolved_ids: &[EntityId],
    ) -> Result<Vec<OutcomeProjection>, ReasonerError> {
        let mut merged: HashMap<EntityId, MergedOutcome> = HashMap::new();

        for &id in resolved_ids {
            for edge in self.store.edges_from(id)? {
                if self.is_outcome(edge.target_id)? {
                    let entry = merged.entry(edge.target_id).or_default();
                    entry.weight += edge.weight;
                    entry.positive += edge.positive_outcomes;
                    entry.negative += edge.negative_outcomes;
                    entry.mixed += edge.mixed_outcomes;
                    entry.contributors = entry.contributors.max(edge.contributor_count);
                }
            }
            for edge in self.store.edges_to(id)? {
                if self.is_outcome(edge.source_id)? {
                    let entry = merged.entry(edge.source_id).or_default();
                    entry.weight += edge.weight;
                    entry.positive += edge.positive_outcomes;
                    entry.negative += edge.negative_outcomes;
                    entry.mixed += edge.mixed_outcomes;
                    entry.contributors = entry.contributors.max(edge.contributor_count);
                }
            }
        }

        let total_weight: u64 = merged.values().map(|m| m.weight).sum();
        let mut outcomes = Vec::with_capacity(merged.len());
        for (id, merged) in merged {
            let Some(entity) = self.store.get_entity(id)? else {
                continue;
            };
            let probability = if total_weight > 0 {
                merged.weight as f64 / total_weight as f64
            } else {
                0.0
            };
            outcomes.push(OutcomeProjection {
                entity,
                weight: merged.weight,
                probability,
                positive_count: merged.positive,
                negative_count: merged.negative,
                mixed_count: merged.mixed,
                contributor_count: merged.contributors,
            });
        }
        outcomes.sort_by(|a, b| {
            b.probability
                .partial_cmp(&a.probability)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(outcomes)
    }

    /// Ranks co-occurring context/constraint/strategy entities by how
    /// strongly their own outgoing outcome edges skew positive or
    /// negative, keeping only the top `differentiator_result_cap`
    /// candidates whose skew clears `differentiator_magnitude_cutoff`.
    fn find_differentiators_from_structure(
        &self,
        resolved_ids: &[EntityId],
    ) -> Result<Vec<Differentiator>, ReasonerError> {
        let mut pool: Vec<(EntityId, u64)> = Vec::new();
        let mut seen: HashSet<EntityId> = HashSet::new();

        for &id in resolved_ids {
            for pair in self.store.cooccurrences_for(id)? {
                let other = if pair.entity_a == id {
                    pair.entity_b
                } else {
                    pair.entity_a
                };
                if resolved_ids.contains(&other) || !seen.insert(other) {
                    continue;
                }
                let Some(candidate) = self.store.get_entity(other)? else {
                    continue;
                };
                let is_candidate_type = candidate
                    .entity_type
                    .as_ref()
                    .map(EntityType::is_differentiator_candidate)
                    .unwrap_or(false);
                if is_candidate_type {
                    pool.push((other, pair.count));
                }
            }
        }

        pool.sort_by(|a, b| b.1.cmp(&a.1));
        pool.truncate(self.config.differentiator_candidate_pool);

        let mut differentiators = Vec::new();
        for (id, cooccurrence_strength) in pool {
            let Some(entity) = self.store.get_entity(id)? else {
                continue;
            };
            let (positive, negative) = self.outcome_valence_from(id)?;
            let denom = positive + negative;
            // No valence data yet defaults to the neutral baseline
            // rather than being dropped outright.
            let positive_rate = if denom > 0 {
                positive as f64 / denom as f64
            } else {
                0.5
            };
            let magnitude = (positive_rate - 0.5).abs();
            if magnitude <= self.config.differentiator_magnitude_cutoff {
                continue;
            }
            let effect = if positive_rate > 0.6 {
                DifferentiatorEffect::Improves
            } else if positive_rate < 0.4 {
                DifferentiatorEffect::Reduces
            } else {
                DifferentiatorEffect::Mixed
            };
            let role = entity
                .entity_type
                .clone()
                .unwrap_or_else(EntityType::topic);
            differentiators.push(Differentiator {
                entity,
                role,
                effect,
                magnitude,
                cooccurrence_strength,
            });
        }

        differentiators.sort_by(|a, b| {
            b.magnitude
                .partial_cmp(&a.magnitude)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        differentiators.truncate(self.config.differentiator_result_cap);
        Ok(differentiators)
    }

    fn is_outcome(&self, id: EntityId) -> Result<bool, ReasonerError> {
        Ok(self
            .store
            .get_entity(id)?
            .and_then(|e| e.entity_type)
            .map(|t| t.is_outcome())
            .unwrap_or(false))
    }

    fn outcome_valence_from(&self, id: EntityId) -> Result<(u64, u64), ReasonerError> {
        let mut positive = 0;
        let mut negative = 0;
        for edge in self.store.edges_from(id)? {
            if self.is_outcome(edge.target_id)? {
                positive += edge.positive_outcomes;
                negative += edge.negative_outcomes;
            }
        }
        Ok((positive, negative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ResolveInput;
    use chrono::Utc;
    use pck_core::PckConfig;
    use pck_storage::{InMemoryStore, Store};
    use std::sync::Arc;

    fn make_entity(name: &str, entity_type: &str) -> Entity {
        let now = Utc::now();
        Entity {
            id: EntityId::new_v4(),
            name: name.to_string(),
            normalized_name: name.to_lowercase(),
            entity_type: Some(EntityType::new(entity_type)),
            description: None,
            touch_count: 1,
            trajectory_count: 1,
            contributor_count: 1,
            first_seen: now,
            last_seen: now,
        }
    }

    fn reasoner(store: Arc<InMemoryStore>) -> GraphReasoner {
        GraphReasoner::new(store, PckConfig::default())
    }

    #[test]
    fn no_resolved_entities_yields_empty_simulation() {
        let store = Arc::new(InMemoryStore::new());
        let result = reasoner(store)
            .simulate(&[ResolveInput::new("nothing", None)])
            .unwrap();
        assert!(!result.has_patterns);
        assert_eq!(result.total_observations, 0);
    }

    #[test]
    fn outcomes_are_weighted_by_edge_weight() {
        let store = Arc::new(InMemoryStore::new());
        let fractions = make_entity("fractions", EntityType::TOPIC);
        let mastery = make_entity("mastery", EntityType::OUTCOME);
        let confusion = make_entity("confusion", EntityType::OUTCOME);
        for e in [&fractions, &mastery, &confusion] {
            store.insert_entity(e.clone()).unwrap();
        }
        store
            .upsert_edge(fractions.id, mastery.id, Box::new(|e| e.weight = 3))
            .unwrap();
        store
            .upsert_edge(fractions.id, confusion.id, Box::new(|e| e.weight = 1))
            .unwrap();

        let result = reasoner(store)
            .simulate(&[ResolveInput::new("fractions", None)])
            .unwrap();

        assert_eq!(result.total_observations, 4);
        assert_eq!(result.outcomes[0].entity.id, mastery.id);
        assert!((result.outcomes[0].probability - 0.75).abs() < 1e-9);
        assert_eq!(result.outcomes[1].entity.id, confusion.id);
        assert!((result.outcomes[1].probability - 0.25).abs() < 1e-9);
    }

    #[test]
    fn reverse_direction_outcome_edges_are_also_projected() {
        let store = Arc::new(InMemoryStore::new());
        let fractions = make_entity("fractions", EntityType::TOPIC);
        let mastery = make_entity("mastery", EntityType::OUTCOME);
        store.insert_entity(fractions.clone()).unwrap();
        store.insert_entity(mastery.clone()).unwrap();
        // Edge stored source=outcome, target=topic — still discovered
        // via edges_to from the topic's perspective.
        store
            .upsert_edge(mastery.id, fractions.id, Box::new(|e| e.weight = 2))
            .unwrap();

        let result = reasoner(store)
            .simulate(&[ResolveInput::new("fractions", None)])
            .unwrap();
        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(result.outcomes[0].entity.id, mastery.id);
    }

    #[test]
    fn differentiator_below_magnitude_cutoff_is_dropped() {
        let store = Arc::new(InMemoryStore::new());
        let fractions = make_entity("fractions", EntityType::TOPIC);
        let strategy = make_entity("visual aids", EntityType::STRATEGY);
        store.insert_entity(fractions.clone()).unwrap();
        store.insert_entity(strategy.clone()).unwrap();
        store
            .upsert_cooccurrence(fractions.id, strategy.id, Box::new(|c| c.count = 5))
            .unwrap();
        // No outgoing outcome edges from `strategy` at all, so its
        // positive rate defaults to the neutral 0.5 baseline and gets
        // dropped by the magnitude cutoff.

        let result = reasoner(store)
            .simulate(&[ResolveInput::new("fractions", None)])
            .unwrap();
        assert!(result.differentiators.is_empty());
    }

    #[test]
    fn differentiator_with_skewed_valence_is_classified_improves() {
        let store = Arc::new(InMemoryStore::new());
        let fractions = make_entity("fractions", EntityType::TOPIC);
        let strategy = make_entity("visual aids", EntityType::STRATEGY);
        let mastery = make_entity("mastery", EntityType::OUTCOME);
        for e in [&fractions, &strategy, &mastery] {
            store.insert_entity(e.clone()).unwrap();
        }
        store
            .upsert_cooccurrence(fractions.id, strategy.id, Box::new(|c| c.count = 5))
            .unwrap();
        store
            .upsert_edge(
                strategy.id,
                mastery.id,
                Box::new(|e| {
                    e.weight = 9;
                    e.positive_outcomes = 9;
                }),
            )
            .unwrap();

        let result = reasoner(store)
            .simulate(&[ResolveInput::new("fractions", None)])
            .unwrap();
        assert_eq!(result.differentiators.len(), 1);
        assert_eq!(result.differentiators[0].effect, DifferentiatorEffect::Improves);
    }
}
