//! Deterministic prose rendering of a `SimulationResult` for injection
//! into an LLM prompt. Pure function of its input: the same
//! `SimulationResult` always renders to byte-identical text, so the
//! agent orchestrator can call it without coordinating on anything
//! beyond what `simulate` already returned.

use crate::simulate::{DifferentiatorEffect, SimulationResult};
use std::fmt::Write as _;

pub fn format_for_ai(result: &SimulationResult) -> String {
    let mut out = String::new();

    write!(out, "Situation involves: ").ok();
    if result.resolved.is_empty() {
        out.push_str("no recognized entities.");
    } else {
        let names: Vec<&str> = result.resolved.iter().map(|e| e.name.as_str()).collect();
        out.push_str(&names.join(", "));
        out.push('.');
    }
    out.push('\n');

    if !result.unresolved.is_empty() {
        writeln!(out, "Not recognized: {}.", result.unresolved.join(", ")).ok();
    }

    out.push_str("\nObserved outcomes from similar situations:\n");
    if result.outcomes.is_empty() {
        out.push_str("  (no prior observations for this combination)\n");
    } else {
        for outcome in &result.outcomes {
            writeln!(
                out,
                "  - {}: {:.0}% ({} observations across {} contributors)",
                outcome.entity.name,
                outcome.probability * 100.0,
                outcome.weight,
                outcome.contributor_count,
            )
            .ok();
        }
    }

    out.push_str("\nFactors that may influence outcomes:\n");
    if result.differentiators.is_empty() {
        out.push_str("  (none identified)\n");
    } else {
        for d in &result.differentiators {
            let verb = match d.effect {
                DifferentiatorEffect::Improves => "tends to improve",
                DifferentiatorEffect::Reduces => "tends to reduce",
                DifferentiatorEffect::Mixed => "has mixed effects on",
            };
            writeln!(
                out,
                "  - {} ({}) {} outcomes",
                d.entity.name,
                d.role.as_str(),
                verb
            )
            .ok();
        }
    }

    if result.total_observations < 5 {
        out.push_str("\nLimited data: treat this projection as provisional.\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::{Differentiator, OutcomeProjection};
    use chrono::Utc;
    use pck_core::{Entity, EntityId, EntityType};

    fn entity(name: &str, entity_type: &str) -> Entity {
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

    #[test]
    fn empty_simulation_still_renders_all_sections() {
        let result = SimulationResult::default();
        let text = format_for_ai(&result);
        assert!(text.contains("no recognized entities"));
        assert!(text.contains("no prior observations"));
        assert!(text.contains("none identified"));
    }

    #[test]
    fn format_for_ai_is_pure() {
        let mut result = SimulationResult::default();
        result.resolved.push(entity("Fractions", EntityType::TOPIC));
        result.outcomes.push(OutcomeProjection {
            entity: entity("Mastery", EntityType::OUTCOME),
            weight: 12,
            probability: 0.8,
            positive_count: 0,
            negative_count: 0,
            mixed_count: 0,
            contributor_count: 3,
        });
        result.differentiators.push(Differentiator {
            entity: entity("Visual aids", EntityType::STRATEGY),
            role: EntityType::new(EntityType::STRATEGY),
            effect: DifferentiatorEffect::Improves,
            magnitude: 0.3,
            cooccurrence_strength: 4,
        });
        result.total_observations = 12;

        assert_eq!(format_for_ai(&result), format_for_ai(&result));
    }

    #[test]
    fn low_observation_count_adds_provisional_note() {
        let mut result = SimulationResult::default();
        result.total_observations = 2;
        assert!(format_for_ai(&result).contains("provisional"));
    }
}
