//! Per-turn orchestration: tag-parse, simulate, stream the model,
//! then close out the trajectory and persist the assistant's reply.
//!
//! This is the one crate downstream of every other graph crate
//! (`pck-tagparser`, `pck-engine`, `pck-reasoner`) plus `pck-llm` — it
//! has no graph logic of its own, only the sequencing of calls into
//! them for a single chat turn.

mod cancellation;
mod events;
mod orchestrator;

pub use cancellation::CancellationToken;
pub use events::{
    ChunkPayload, CompletePayload, ErrorPayload, OrchestratorEvent, TagSource,
    TrajectoryEventKind, TrajectoryEventPayload,
};
pub use orchestrator::{AgentOrchestrator, ChatTurnInput, OrchestratorStream};
