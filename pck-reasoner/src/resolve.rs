//! Name resolution: turning a user-supplied `(name, type?)` pair into
//! the entity row it most likely refers to.

use crate::GraphReasoner;
use pck_core::{Entity, EntityType, ReasonerError};

/// One input slot to `resolve`/`simulate`/`counterfactual`: a name as
/// typed by a caller, optionally narrowed to a known `EntityType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveInput {
    pub name: String,
    pub entity_type: Option<EntityType>,
}

impl ResolveInput {
    pub fn new(name: impl Into<String>, entity_type: Option<EntityType>) -> Self {
        Self {
            name: name.into(),
            entity_type,
        }
    }

    pub(crate) fn normalized(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

/// Result of resolving a batch of `ResolveInput`s against the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveResult {
    pub resolved: Vec<Entity>,
    /// Names that matched nothing, exact or partial.
    pub unresolved: Vec<String>,
}

impl GraphReasoner {
    /// Resolves each input independently: first an exact
    /// `normalized_name` match constrained to `entity_type` (when
    /// given), then a substring match ranked by `touch_count`, taking
    /// the top candidate. A name that matches neither is reported in
    /// `unresolved` rather than failing the whole call.
    pub fn resolve(&self, inputs: &[ResolveInput]) -> Result<ResolveResult, ReasonerError> {
        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();

        for input in inputs {
            if let Some(entity) = self.resolve_one(input)? {
                resolved.push(entity);
            } else {
                unresolved.push(input.name.clone());
            }
        }

        Ok(ResolveResult {
            resolved,
            unresolved,
        })
    }

    fn resolve_one(&self, input: &ResolveInput) -> Result<Option<Entity>, ReasonerError> {
        let normalized = input.normalized();

        if let Some(entity) = self.store.find_entity_by_normalized_name(&normalized)? {
            let type_matches = match &input.entity_type {
                Some(t) => entity.entity_type.as_ref() == Some(t),
                None => true,
            };
            if type_matches {
                return Ok(Some(entity));
            }
        }

        let candidates = self
            .store
            .find_entities_by_substring(&normalized, input.entity_type.as_ref())?;
        Ok(candidates.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pck_core::{EntityId, PckConfig};
    use pck_storage::{InMemoryStore, Store};
    use std::sync::Arc;

    fn make_entity(name: &str, entity_type: Option<&str>) -> Entity {
        let now = Utc::now();
        Entity {
            id: EntityId::new_v4(),
            name: name.to_string(),
            normalized_name: name.to_lowercase(),
            entity_type: entity_type.map(EntityType::new),
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
    fn exact_name_match_wins_over_partial() {
        let store = Arc::new(InMemoryStore::new());
        let fractions = make_entity("Fractions", Some(EntityType::TOPIC));
        store.insert_entity(fractions.clone()).unwrap();

        let result = reasoner(store)
            .resolve(&[ResolveInput::new("Fractions", None)])
            .unwrap();
        assert_eq!(result.resolved, vec![fractions]);
        assert!(result.unresolved.is_empty());
    }

    #[test]
    fn type_mismatch_on_exact_match_falls_back_to_partial() {
        let store = Arc::new(InMemoryStore::new());
        let as_topic = make_entity("fractions", Some(EntityType::TOPIC));
        store.insert_entity(as_topic).unwrap();
        let as_strategy = make_entity("fractions tiles", Some(EntityType::STRATEGY));
        store.insert_entity(as_strategy.clone()).unwrap();

        let input = ResolveInput::new("fractions", Some(EntityType::new(EntityType::STRATEGY)));
        let result = reasoner(store).resolve(&[input]).unwrap();
        assert_eq!(result.resolved, vec![as_strategy]);
    }

    #[test]
    fn unmatched_name_is_reported_unresolved() {
        let store = Arc::new(InMemoryStore::new());
        let result = reasoner(store)
            .resolve(&[ResolveInput::new("nonexistent", None)])
            .unwrap();
        assert!(result.resolved.is_empty());
        assert_eq!(result.unresolved, vec!["nonexistent".to_string()]);
    }

    #[test]
    fn partial_match_picks_highest_touch_count() {
        let store = Arc::new(InMemoryStore::new());
        let mut popular = make_entity("fraction basics", Some(EntityType::TOPIC));
        popular.touch_count = 50;
        let mut rare = make_entity("fraction drills", Some(EntityType::TOPIC));
        rare.touch_count = 1;
        store.insert_entity(rare).unwrap();
        store.insert_entity(popular.clone()).unwrap();

        let result = reasoner(store)
            .resolve(&[ResolveInput::new("fraction", None)])
            .unwrap();
        assert_eq!(result.resolved, vec![popular]);
    }
}
