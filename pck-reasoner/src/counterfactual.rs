//! `counterfactual`: runs `simulate` twice — once on a base situation,
//! once on that same situation with a single input swapped — and
//! reports how the outcome distribution shifted.

use crate::resolve::ResolveInput;
use crate::simulate::SimulationResult;
use crate::GraphReasoner;
use pck_core::{Entity, EntityId, ReasonerError};
use serde::Serialize;
use std::collections::HashSet;

/// The single substitution a `counterfactual` call asks about: "what
/// if `from` were `to` instead?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSpec {
    pub from: ResolveInput,
    pub to: ResolveInput,
}

/// How one outcome's projected probability moved between the base and
/// alternative simulations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeShift {
    pub entity: Entity,
    pub base_probability: f64,
    pub alt_probability: f64,
    /// `alt_probability - base_probability`.
    pub delta: f64,
}

/// Overall direction of the swap, gated on having enough observations
/// in both simulations to say anything at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetEffect {
    Positive,
    Negative,
    Neutral,
    Uncertain,
}

/// The comparison half of a `counterfactual` call's result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// Every outcome seen in either simulation, sorted by `|delta|`
    /// descending.
    pub outcome_shifts: Vec<OutcomeShift>,
    pub net_effect: NetEffect,
    pub recommendation: String,
}

/// Full output of one `counterfactual` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterfactualResult {
    pub base: SimulationResult,
    pub alternative: SimulationResult,
    pub comparison: Comparison,
}

/// Outcome-name fragments treated as evidence of a favorable outcome
/// when weighing `NetEffect`. Matched against `normalized_name`, so
/// case and whitespace variants all hit the same markers.
const POSITIVE_OUTCOME_MARKERS: &[&str] = &[
    "improved",
    "success",
    "understanding",
    "mastery",
    "effective",
];

impl GraphReasoner {
    /// Simulates `base` and `base` with `change` applied, then compares
    /// the two outcome distributions. `netEffect` is forced to
    /// `Uncertain` whenever either simulation's `total_observations`
    /// falls below `counterfactual_uncertainty_floor`; otherwise it is
    /// `Positive`/`Negative`/`Neutral` depending on how the weighted
    /// shift toward positively-named outcomes compares to
    /// `counterfactual_neutral_threshold`.
    pub fn counterfactual(
        &self,
        base: &[ResolveInput],
        change: ChangeSpec,
    ) -> Result<CounterfactualResult, ReasonerError> {
        let base_result = self.simulate(base)?;
        let alt_inputs = apply_swap(base, &change);
        let alt_result = self.simulate(&alt_inputs)?;

        let outcome_shifts = diff_outcomes(&base_result, &alt_result);

        let min_observations = base_result
            .total_observations
            .min(alt_result.total_observations);
        let marker_shift: f64 = outcome_shifts
            .iter()
            .filter(|shift| is_positively_named(&shift.entity))
            .map(|shift| shift.delta)
            .sum();

        let net_effect = if min_observations < self.config.counterfactual_uncertainty_floor {
            NetEffect::Uncertain
        } else if marker_shift > self.config.counterfactual_neutral_threshold {
            NetEffect::Positive
        } else if marker_shift < -self.config.counterfactual_neutral_threshold {
            NetEffect::Negative
        } else {
            NetEffect::Neutral
        };

        let recommendation = recommendation_for(net_effect, &change);

        Ok(CounterfactualResult {
            base: base_result,
            alternative: alt_result,
            comparison: Comparison {
                outcome_shifts,
                net_effect,
                recommendation,
            },
        })
    }
}

/// Replaces every input matching `change.from` (by case-insensitive
/// name, and by type when `change.from.entity_type` is set) with
/// `change.to`. If nothing matched, appends `change.to` to the
/// situation unchanged rather than silently doing nothing.
fn apply_swap(base: &[ResolveInput], change: &ChangeSpec) -> Vec<ResolveInput> {
    let mut matched = false;
    let from_normalized = change.from.normalized();

    let mut alt: Vec<ResolveInput> = base
        .iter()
        .map(|input| {
            let name_matches = input.normalized() == from_normalized;
            let type_matches = match &change.from.entity_type {
                Some(t) => input.entity_type.as_ref() == Some(t),
                None => true,
            };
            if name_matches && type_matches {
                matched = true;
                change.to.clone()
            } else {
                input.clone()
            }
        })
        .collect();

    if !matched {
        alt.push(change.to.clone());
    }
    alt
}

fn diff_outcomes(base: &SimulationResult, alt: &SimulationResult) -> Vec<OutcomeShift> {
    let mut order: Vec<EntityId> = Vec::new();
    let mut seen: HashSet<EntityId> = HashSet::new();
    for outcome in base.outcomes.iter().chain(alt.outcomes.iter()) {
        if seen.insert(outcome.entity.id) {
            order.push(outcome.entity.id);
        }
    }

    let mut shifts: Vec<OutcomeShift> = order
        .into_iter()
        .map(|id| {
            let base_hit = base.outcomes.iter().find(|o| o.entity.id == id);
            let alt_hit = alt.outcomes.iter().find(|o| o.entity.id == id);
            let entity = base_hit
                .or(alt_hit)
                .map(|o| o.entity.clone())
                .expect("id came from one of the two outcome lists");
            let base_probability = base_hit.map(|o| o.probability).unwrap_or(0.0);
            let alt_probability = alt_hit.map(|o| o.probability).unwrap_or(0.0);
            OutcomeShift {
                entity,
                base_probability,
                alt_probability,
                delta: alt_probability - base_probability,
            }
        })
        .collect();

    shifts.sort_by(|a, b| {
        b.delta
            .abs()
            .partial_cmp(&a.delta.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    shifts
}

fn is_positively_named(entity: &Entity) -> bool {
    POSITIVE_OUTCOME_MARKERS
        .iter()
        .any(|marker| entity.normalized_name.contains(marker))
}

fn recommendation_for(net_effect: NetEffect, change: &ChangeSpec) -> String {
    match net_effect {
        NetEffect::Positive => format!(
            "Switching to \"{}\" shows a favorable shift in the observed data.",
            change.to.name
        ),
        NetEffect::Negative => format!(
            "Switching to \"{}\" shows an unfavorable shift in the observed data.",
            change.to.name
        ),
        NetEffect::Neutral => {
            "The observed data shows no meaningful difference between the two options.".to_string()
        }
        NetEffect::Uncertain => {
            "Not enough observations yet to recommend either option with confidence.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GraphReasoner;
    use chrono::Utc;
    use pck_core::{Entity, EntityId, EntityType, PckConfig};
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

    fn reasoner(store: Arc<InMemoryStore>, config: PckConfig) -> GraphReasoner {
        GraphReasoner::new(store, config)
    }

    #[test]
    fn low_observation_count_forces_uncertain() {
        let store = Arc::new(InMemoryStore::new());
        let fractions = make_entity("fractions", EntityType::TOPIC);
        store.insert_entity(fractions.clone()).unwrap();

        let change = ChangeSpec {
            from: ResolveInput::new("fractions", None),
            to: ResolveInput::new("decimals", None),
        };
        let result = reasoner(store, PckConfig::default())
            .counterfactual(&[ResolveInput::new("fractions", None)], change)
            .unwrap();
        assert_eq!(result.comparison.net_effect, NetEffect::Uncertain);
    }

    #[test]
    fn swap_replaces_matching_input_by_name() {
        let base = vec![
            ResolveInput::new("fractions", None),
            ResolveInput::new("visual aids", None),
        ];
        let change = ChangeSpec {
            from: ResolveInput::new("visual aids", None),
            to: ResolveInput::new("number lines", None),
        };
        let alt = apply_swap(&base, &change);
        assert_eq!(alt[0].name, "fractions");
        assert_eq!(alt[1].name, "number lines");
    }

    #[test]
    fn swap_appends_when_nothing_matched() {
        let base = vec![ResolveInput::new("fractions", None)];
        let change = ChangeSpec {
            from: ResolveInput::new("decimals", None),
            to: ResolveInput::new("number lines", None),
        };
        let alt = apply_swap(&base, &change);
        assert_eq!(alt.len(), 2);
        assert_eq!(alt[1].name, "number lines");
    }

    #[test]
    fn sufficient_observations_yield_positive_net_effect() {
        let store = Arc::new(InMemoryStore::new());
        let fractions = make_entity("fractions", EntityType::TOPIC);
        let tiles = make_entity("fraction tiles", EntityType::STRATEGY);
        let mastery = make_entity("mastery success", EntityType::OUTCOME);
        let confusion = make_entity("confusion", EntityType::OUTCOME);
        for e in [&fractions, &tiles, &mastery, &confusion] {
            store.insert_entity(e.clone()).unwrap();
        }
        store
            .upsert_edge(fractions.id, mastery.id, Box::new(|e| e.weight = 6))
            .unwrap();
        store
            .upsert_edge(fractions.id, confusion.id, Box::new(|e| e.weight = 6))
            .unwrap();
        store
            .upsert_edge(tiles.id, mastery.id, Box::new(|e| e.weight = 18))
            .unwrap();
        store
            .upsert_edge(tiles.id, confusion.id, Box::new(|e| e.weight = 2))
            .unwrap();

        let change = ChangeSpec {
            from: ResolveInput::new("fractions", None),
            to: ResolveInput::new("fraction tiles", None),
        };
        let result = reasoner(store, PckConfig::default())
            .counterfactual(&[ResolveInput::new("fractions", None)], change)
            .unwrap();
        assert_eq!(result.comparison.net_effect, NetEffect::Positive);
    }
}
