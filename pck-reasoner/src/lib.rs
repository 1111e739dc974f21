//! Pure-read graph-structural inference over the PCK knowledge graph.
//!
//! `GraphReasoner` never reads trajectory events — every answer it
//! gives comes from edges and co-occurrences that `pck-engine` already
//! finished writing. `simulate` projects an outcome distribution and
//! ranks differentiating factors for a proposed teaching situation;
//! `counterfactual` compares two simulations under a single swapped
//! input.

mod counterfactual;
mod format;
mod resolve;
mod simulate;

pub use counterfactual::{ChangeSpec, Comparison, CounterfactualResult, NetEffect, OutcomeShift};
pub use format::format_for_ai;
pub use resolve::{ResolveInput, ResolveResult};
pub use simulate::{Differentiator, DifferentiatorEffect, OutcomeProjection, SimulationResult};

use pck_core::PckConfig;
use pck_storage::Store;
use std::sync::Arc;

/// Holds the store handle and the tunables from §9/spec config that
/// govern candidate-pool sizes and classification thresholds.
pub struct GraphReasoner {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) config: PckConfig,
}

impl GraphReasoner {
    pub fn new(store: Arc<dyn Store>, config: PckConfig) -> Self {
        Self { store, config }
    }

    pub fn with_default_config(store: Arc<dyn Store>) -> Self {
        Self::new(store, PckConfig::default())
    }
}
