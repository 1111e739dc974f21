//! Lexical extraction of `[[type:name]]` tag markup and weak
//! decision-context cues from free-form chat text.
//!
//! Matching here is purely lexical — no attempt is made to understand
//! what a tag or cue *means*; that is left entirely to the graph these
//! mentions eventually land in.

use once_cell::sync::Lazy;
use pck_core::EntityType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static TYPED_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([A-Za-z][A-Za-z0-9_]*):([^\]]+)\]\]").unwrap());

static ANY_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").unwrap());

/// One `[[type:name]]` or `[[name]]` mention resolved to a normalized
/// `(entity_type, name)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMention {
    pub entity_type: EntityType,
    pub name: String,
}

/// Scans `text` for tag markup, left to right.
///
/// Two passes: typed `[[word:content]]` first, then untyped
/// `[[content]]` over whatever bracket spans the typed pass did not
/// already claim. Results are deduplicated by `(entity_type, name)`,
/// keeping first-occurrence order.
pub fn parse_tags(text: &str) -> Vec<TagMention> {
    let mut taken_spans: HashSet<(usize, usize)> = HashSet::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut mentions = Vec::new();

    for caps in TYPED_TAG_RE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        taken_spans.insert((whole.start(), whole.end()));

        let entity_type = EntityType::new(caps[1].to_string());
        let name = caps[2].trim().to_lowercase();
        if name.is_empty() {
            continue;
        }
        let key = (entity_type.as_str().to_string(), name.clone());
        if seen.insert(key) {
            mentions.push(TagMention { entity_type, name });
        }
    }

    for caps in ANY_TAG_RE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        if taken_spans.contains(&(whole.start(), whole.end())) {
            continue;
        }
        let name = caps[1].trim().to_lowercase();
        if name.is_empty() {
            continue;
        }
        let entity_type = EntityType::topic();
        let key = (entity_type.as_str().to_string(), name.clone());
        if seen.insert(key) {
            mentions.push(TagMention { entity_type, name });
        }
    }

    mentions
}

// ============================================================================
// DECISION CONTEXT
// ============================================================================

/// Weak cues pulled from free prose around a message. Advisory only —
/// these feed `Event::data._context` and are never read back by the
/// graph engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionContext {
    pub trigger: Option<String>,
    pub observations: Vec<String>,
    pub constraints: Vec<String>,
    pub expected_outcome: Option<String>,
    pub rationale: Option<String>,
    pub prior_experience: Option<String>,
}

impl DecisionContext {
    pub fn is_empty(&self) -> bool {
        self.trigger.is_none()
            && self.observations.is_empty()
            && self.constraints.is_empty()
            && self.expected_outcome.is_none()
            && self.rationale.is_none()
            && self.prior_experience.is_none()
    }
}

macro_rules! cue_regex {
    ($keyword_alt:literal) => {
        Lazy::new(|| {
            Regex::new(&format!(r"(?i)(?:{}):\s*([^\n]+)", $keyword_alt)).unwrap()
        })
    };
}

static TRIGGER_RE: Lazy<Regex> = cue_regex!("trigger");
static OBSERVATIONS_RE: Lazy<Regex> = cue_regex!("observations?|observed");
static CONSTRAINTS_RE: Lazy<Regex> = cue_regex!("constraints?");
static EXPECTED_OUTCOME_RE: Lazy<Regex> = cue_regex!("expected\\s*outcome");
static RATIONALE_RE: Lazy<Regex> = cue_regex!("rationale|because");
static PRIOR_EXPERIENCE_RE: Lazy<Regex> = cue_regex!("prior\\s*experience");

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(&[',', ';'][..])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extracts decision-context cues from free prose. Each cue family is
/// an independent, best-effort regex match; absence of a cue is not an
/// error.
pub fn extract_decision_context(text: &str) -> DecisionContext {
    DecisionContext {
        trigger: first_capture(&TRIGGER_RE, text),
        observations: first_capture(&OBSERVATIONS_RE, text)
            .map(|s| split_list(&s))
            .unwrap_or_default(),
        constraints: first_capture(&CONSTRAINTS_RE, text)
            .map(|s| split_list(&s))
            .unwrap_or_default(),
        expected_outcome: first_capture(&EXPECTED_OUTCOME_RE, text),
        rationale: first_capture(&RATIONALE_RE, text),
        prior_experience: first_capture(&PRIOR_EXPERIENCE_RE, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_tag() {
        let mentions = parse_tags("Teaching [[topic:fractions]] today");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].name, "fractions");
        assert_eq!(mentions[0].entity_type.as_str(), "topic");
    }

    #[test]
    fn untyped_tag_falls_back_to_topic() {
        let mentions = parse_tags("Let's discuss [[fractions]]");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].entity_type, EntityType::topic());
    }

    #[test]
    fn typed_tag_is_not_double_counted_by_untyped_pass() {
        let mentions = parse_tags("[[strategy:visual models]]");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].entity_type.as_str(), "strategy");
    }

    #[test]
    fn unknown_type_words_are_retained_verbatim() {
        let mentions = parse_tags("[[pedagogical-device:manipulatives]]");
        assert_eq!(mentions[0].entity_type.as_str(), "pedagogical-device");
    }

    #[test]
    fn mixed_typed_and_untyped_tags_both_parse() {
        let mentions = parse_tags(
            "Teaching [[topic:fractions]] with [[strategy:visual models]] and [[manipulatives]]",
        );
        assert_eq!(mentions.len(), 3);
        assert_eq!(mentions[2].entity_type, EntityType::topic());
        assert_eq!(mentions[2].name, "manipulatives");
    }

    #[test]
    fn dedups_by_type_and_name_keeping_first_occurrence_order() {
        let mentions = parse_tags("[[topic:fractions]] ... [[topic:Fractions]] ... [[topic:decimals]]");
        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0].name, "fractions");
        assert_eq!(mentions[1].name, "decimals");
    }

    #[test]
    fn name_and_type_are_trimmed_and_lowercased() {
        let mentions = parse_tags("[[Strategy:  Visual Models  ]]");
        assert_eq!(mentions[0].entity_type.as_str(), "strategy");
        assert_eq!(mentions[0].name, "visual models");
    }

    #[test]
    fn no_tags_yields_empty_vec() {
        assert!(parse_tags("plain text, no markup here").is_empty());
    }

    #[test]
    fn extracts_trigger_and_observations() {
        let ctx = extract_decision_context(
            "Trigger: student confusion on division\nObservations: low engagement, repeated errors",
        );
        assert_eq!(
            ctx.trigger.as_deref(),
            Some("student confusion on division")
        );
        assert_eq!(ctx.observations, vec!["low engagement", "repeated errors"]);
    }

    #[test]
    fn missing_cues_leave_fields_empty() {
        let ctx = extract_decision_context("no structured cues in here");
        assert!(ctx.is_empty());
    }

    #[test]
    fn extracts_constraints_and_expected_outcome() {
        let ctx = extract_decision_context(
            "Constraints: 30 minute period, no manipulatives\nExpected outcome: improved retention",
        );
        assert_eq!(ctx.constraints, vec!["30 minute period", "no manipulatives"]);
        assert_eq!(ctx.expected_outcome.as_deref(), Some("improved retention"));
    }
}
