//! Enum and lightweight classification types for PCK entities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pedagogical entity type.
///
/// Deliberately *not* a closed Rust enum: the tag grammar (see the
/// `pck-tagparser` crate) accepts any ASCII identifier as a type word,
/// and an entity created from an unrecognized type word keeps that
/// word verbatim as its `entity_type`. The constants below name the
/// types the rest of the system gives special treatment to (outcome
/// projection, differentiator search); anything else is just a string
/// the graph stores and never special-cases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(String);

impl EntityType {
    pub const TOPIC: &'static str = "topic";
    pub const MISCONCEPTION: &'static str = "misconception";
    pub const STRATEGY: &'static str = "strategy";
    pub const CONTEXT: &'static str = "context";
    pub const CONSTRAINT: &'static str = "constraint";
    pub const OUTCOME: &'static str = "outcome";
    pub const CONCEPT: &'static str = "concept";

    /// Normalizes to lower-case, matching the tag parser's own
    /// normalization so `EntityType::new("Strategy")` and the type
    /// word parsed out of `[[Strategy:x]]` compare equal.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_lowercase())
    }

    pub fn topic() -> Self {
        Self::new(Self::TOPIC)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_strategy(&self) -> bool {
        self.0 == Self::STRATEGY
    }

    pub fn is_outcome(&self) -> bool {
        self.0 == Self::OUTCOME
    }

    /// Context, constraint or strategy: the types the reasoner treats
    /// as candidate differentiators.
    pub fn is_differentiator_candidate(&self) -> bool {
        matches!(self.0.as_str(), Self::CONTEXT | Self::CONSTRAINT | Self::STRATEGY)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EntityType {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Kind of event recorded within a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A recorded visit to an entity during a walk.
    Touch,
    /// A touch whose entity had not appeared earlier in the walk.
    Discover,
    /// Non-entity reasoning step (e.g. simulation ran, prompt built).
    Reason,
    /// Terminal reasoning step immediately preceding completion.
    Decide,
    /// A `simulate` call was issued mid-turn.
    Simulate,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::Touch => "touch",
            EventType::Discover => "discover",
            EventType::Reason => "reason",
            EventType::Decide => "decide",
            EventType::Simulate => "simulate",
        };
        write!(f, "{}", s)
    }
}

/// Role of the speaker that produced a `Message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        };
        write!(f, "{}", s)
    }
}
