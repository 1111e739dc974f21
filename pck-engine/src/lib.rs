//! Trajectory lifecycle: start a walk, log its events, and on
//! completion mutate the four dependent graph structures (entity
//! aggregates, per-contributor provenance, directed edges,
//! co-occurrences) plus strategy→outcome edges, transactionally.
//!
//! The engine never re-reads raw trajectory events once a trajectory
//! is complete — that is the `GraphReasoner`'s job, and it works
//! purely off edges and co-occurrences.

mod completion;
mod trajectory;

pub use completion::TrajectoryCompletion;
pub use trajectory::{LogEventInput, TrajectoryEngine};
