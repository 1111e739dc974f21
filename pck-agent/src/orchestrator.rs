//! `AgentOrchestrator`: the S0-S12 per-turn state machine.
//!
//! ```text
//! S0 start -> S1 tag-parse(user) -> S2 log-touch(user-tags)
//!    -> S3 simulate(if any tags) -> S4 build-prompt
//!    -> S5 stream-llm -> (S6 chunk-emit)*
//!    -> S7 tag-parse(assistant) -> S8 log-discover/touch(assistant-tags)
//!    -> S9 decide-event -> S10 complete-trajectory
//!    -> S11 persist-assistant-message -> S12 emit-complete
//! ```
//!
//! Each step awaits the previous one; `cancel` is polled between every
//! yielded event. An `S5` failure (or a mid-stream error from the LLM)
//! emits one `Error` event and returns without completing the
//! trajectory — chunks already emitted are not rolled back, since they
//! were advisory only.

use crate::cancellation::CancellationToken;
use crate::events::{
    ChunkPayload, CompletePayload, OrchestratorEvent, TagSource, TrajectoryEventKind,
    TrajectoryEventPayload,
};
use chrono::Utc;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use pck_core::{
    AccountId, AgentError, Conversation, ConversationId, EntityId, EventType, Message, MessageId,
    MessageRole, PckConfig, StoreError, TrajectoryId,
};
use pck_engine::{LogEventInput, TrajectoryEngine};
use pck_llm::{ChatMessage, ChatRequest, LLMClient};
use pck_reasoner::{format_for_ai, GraphReasoner, ResolveInput};
use pck_storage::Store;
use pck_tagparser::{parse_tags, TagMention};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_MAX_TOKENS: u32 = 1024;
const SYSTEM_PROMPT_PREAMBLE: &str =
    "You are a pedagogical content knowledge assistant helping a teacher reason about their practice.";

/// Input to one `run_turn` call.
pub struct ChatTurnInput {
    pub account_id: AccountId,
    pub conversation_id: Option<ConversationId>,
    pub message: String,
}

pub type OrchestratorStream = BoxStream<'static, OrchestratorEvent>;

/// Drives one chat turn against a shared `Store` and `LLMClient`.
///
/// Stateless between turns: the only per-turn state (the trajectory's
/// sequence counter) lives inside `TrajectoryEngine` and is discarded
/// by `complete_trajectory`. Depends on `LLMClient` only through the
/// trait object, so it never knows whether it's driving `MockLlmClient`
/// or a real provider.
pub struct AgentOrchestrator {
    store: Arc<dyn Store>,
    engine: Arc<TrajectoryEngine>,
    reasoner: Arc<GraphReasoner>,
    llm: Arc<dyn LLMClient>,
    config: PckConfig,
}

impl AgentOrchestrator {
    pub fn new(store: Arc<dyn Store>, llm: Arc<dyn LLMClient>, config: PckConfig) -> Self {
        let engine = Arc::new(TrajectoryEngine::new(Arc::clone(&store)));
        let reasoner = Arc::new(GraphReasoner::new(Arc::clone(&store), config.clone()));
        Self {
            store,
            engine,
            reasoner,
            llm,
            config,
        }
    }

    pub fn with_default_config(store: Arc<dyn Store>, llm: Arc<dyn LLMClient>) -> Self {
        Self::new(store, llm, PckConfig::default())
    }

    /// Runs the full per-turn state machine, yielding SSE-bound events
    /// as each step completes. The stream always ends with exactly one
    /// `Complete` or `Error` event.
    pub fn run_turn(&self, input: ChatTurnInput, cancel: CancellationToken) -> OrchestratorStream {
        let store = Arc::clone(&self.store);
        let engine = Arc::clone(&self.engine);
        let reasoner = Arc::clone(&self.reasoner);
        let llm = Arc::clone(&self.llm);
        let timeout_ms = self.config.llm_timeout_ms;

        let stream = async_stream::stream! {
            if input.account_id.as_str().trim().is_empty() {
                yield OrchestratorEvent::error(AgentError::Unauthorized.to_string());
                return;
            }

            let conversation_id = match ensure_conversation(&store, &input.account_id, input.conversation_id) {
                Ok(id) => id,
                Err(e) => { yield OrchestratorEvent::error(e.to_string()); return; }
            };

            let trajectory_id = match engine.start_trajectory(
                input.account_id.clone(),
                input.message.clone(),
                Some(conversation_id),
            ) {
                Ok(id) => id,
                Err(e) => { yield OrchestratorEvent::error(e.to_string()); return; }
            };

            if let Err(e) = persist_message(
                &store,
                conversation_id,
                MessageRole::User,
                &input.message,
                Some(trajectory_id),
            ) {
                yield OrchestratorEvent::error(e.to_string());
                return;
            }

            yield OrchestratorEvent::TrajectoryEvent(TrajectoryEventPayload::kind(
                TrajectoryEventKind::TrajectoryStart,
            ));
            if cancel.is_cancelled() { return; }

            // S1/S2: tag-parse and log-touch every user mention.
            let user_mentions = parse_tags(&input.message);
            let mut seen: HashSet<EntityId> = HashSet::new();
            let mut user_entities: Vec<(EntityId, TagMention)> = Vec::new();
            for mention in &user_mentions {
                let entity_id = match engine.find_or_create_entity(
                    &input.account_id,
                    trajectory_id,
                    &mention.name,
                    Some(mention.entity_type.clone()),
                    None,
                ) {
                    Ok(id) => id,
                    Err(e) => { yield OrchestratorEvent::error(e.to_string()); return; }
                };
                if let Err(e) = engine.log_event(trajectory_id, LogEventInput::touch(entity_id)) {
                    yield OrchestratorEvent::error(e.to_string());
                    return;
                }
                seen.insert(entity_id);
                yield OrchestratorEvent::TrajectoryEvent(TrajectoryEventPayload::touch(
                    entity_id,
                    mention.name.clone(),
                    mention.entity_type.clone(),
                    TagSource::User,
                ));
                user_entities.push((entity_id, mention.clone()));
                if cancel.is_cancelled() { return; }
            }

            // S3: simulate, only if the user referenced anything.
            let mut simulation_text: Option<String> = None;
            let mut simulation_used = false;
            if !user_entities.is_empty() {
                let inputs: Vec<ResolveInput> = user_entities
                    .iter()
                    .map(|(_, m)| ResolveInput::new(m.name.clone(), Some(m.entity_type.clone())))
                    .collect();
                match reasoner.simulate(&inputs) {
                    Ok(result) => {
                        simulation_used = result.has_patterns;
                        let mut payload = TrajectoryEventPayload::kind(TrajectoryEventKind::Simulate);
                        payload.outcome_count = Some(result.outcomes.len());
                        payload.differentiator_count = Some(result.differentiators.len());
                        payload.resolved_count = Some(result.resolved.len());
                        payload.unresolved_count = Some(result.unresolved.len());
                        payload.has_patterns = Some(result.has_patterns);
                        yield OrchestratorEvent::TrajectoryEvent(payload);

                        if let Err(e) = engine.log_event(
                            trajectory_id,
                            LogEventInput {
                                event_type: EventType::Simulate,
                                entity_id: None,
                                data: None,
                                context: None,
                            },
                        ) {
                            yield OrchestratorEvent::error(e.to_string());
                            return;
                        }
                        simulation_text = Some(format_for_ai(&result));
                    }
                    Err(e) => { yield OrchestratorEvent::error(e.to_string()); return; }
                }
                if cancel.is_cancelled() { return; }
            }

            // S4: build the prompt from conversation history plus any
            // simulation context, then emit the single `reason` event.
            let history = match store.messages_for_conversation(conversation_id) {
                Ok(msgs) => msgs,
                Err(e) => { yield OrchestratorEvent::error(e.to_string()); return; }
            };
            let messages: Vec<ChatMessage> = history
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| match m.role {
                    MessageRole::Assistant => ChatMessage::assistant(m.content.clone()),
                    _ => ChatMessage::user(m.content.clone()),
                })
                .collect();

            let mut system_prompt = SYSTEM_PROMPT_PREAMBLE.to_string();
            if let Some(text) = &simulation_text {
                system_prompt.push_str("\n\n");
                system_prompt.push_str(text);
            }

            let mut reason_payload = TrajectoryEventPayload::kind(TrajectoryEventKind::Reason);
            reason_payload.simulation_used = Some(simulation_used);
            yield OrchestratorEvent::TrajectoryEvent(reason_payload);
            if let Err(e) = engine.log_event(
                trajectory_id,
                LogEventInput {
                    event_type: EventType::Reason,
                    entity_id: None,
                    data: None,
                    context: None,
                },
            ) {
                yield OrchestratorEvent::error(e.to_string());
                return;
            }
            if cancel.is_cancelled() { return; }

            let request = ChatRequest {
                system_prompt,
                messages,
                max_tokens: DEFAULT_MAX_TOKENS,
            };

            // S5: stream-llm.
            let mut chat_stream = match tokio::time::timeout(
                Duration::from_millis(timeout_ms),
                llm.stream_chat(request),
            )
            .await
            {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    yield OrchestratorEvent::error_with_detail(
                        "the language model is unavailable",
                        e.to_string(),
                    );
                    return;
                }
                Err(_) => {
                    yield OrchestratorEvent::error(format!(
                        "the language model timed out after {timeout_ms}ms"
                    ));
                    return;
                }
            };

            // S6: chunk-emit.
            let mut full_content = String::new();
            loop {
                if cancel.is_cancelled() { return; }
                match chat_stream.next().await {
                    Some(Ok(chunk)) => {
                        full_content.push_str(&chunk);
                        yield OrchestratorEvent::Chunk(ChunkPayload {
                            content: chunk,
                            full_content: full_content.clone(),
                        });
                    }
                    Some(Err(e)) => {
                        yield OrchestratorEvent::error_with_detail(
                            "the language model stream failed",
                            e.to_string(),
                        );
                        return;
                    }
                    None => break,
                }
            }
            if cancel.is_cancelled() { return; }

            // S7/S8: tag-parse the assistant's reply and log touch/discover.
            let assistant_mentions = parse_tags(&full_content);
            let mut entities_referenced = 0usize;
            let mut new_entities = 0usize;
            for mention in &assistant_mentions {
                let entity_id = match engine.find_or_create_entity(
                    &input.account_id,
                    trajectory_id,
                    &mention.name,
                    Some(mention.entity_type.clone()),
                    None,
                ) {
                    Ok(id) => id,
                    Err(e) => { yield OrchestratorEvent::error(e.to_string()); return; }
                };
                entities_referenced += 1;
                let is_new = seen.insert(entity_id);
                let log_result = if is_new {
                    new_entities += 1;
                    engine.log_event(trajectory_id, LogEventInput::discover(entity_id))
                } else {
                    engine.log_event(trajectory_id, LogEventInput::touch(entity_id))
                };
                if let Err(e) = log_result {
                    yield OrchestratorEvent::error(e.to_string());
                    return;
                }
                let payload = if is_new {
                    TrajectoryEventPayload::discover(
                        entity_id,
                        mention.name.clone(),
                        mention.entity_type.clone(),
                        TagSource::Assistant,
                    )
                } else {
                    TrajectoryEventPayload::touch(
                        entity_id,
                        mention.name.clone(),
                        mention.entity_type.clone(),
                        TagSource::Assistant,
                    )
                };
                yield OrchestratorEvent::TrajectoryEvent(payload);
                if cancel.is_cancelled() { return; }
            }

            // S9: decide.
            let mut decide_payload = TrajectoryEventPayload::kind(TrajectoryEventKind::Decide);
            decide_payload.action = Some("respond".to_string());
            decide_payload.entities_referenced = Some(entities_referenced);
            decide_payload.new_entities = Some(new_entities);
            yield OrchestratorEvent::TrajectoryEvent(decide_payload);
            if let Err(e) = engine.log_event(
                trajectory_id,
                LogEventInput {
                    event_type: EventType::Decide,
                    entity_id: None,
                    data: None,
                    context: None,
                },
            ) {
                yield OrchestratorEvent::error(e.to_string());
                return;
            }
            if cancel.is_cancelled() { return; }

            // S10: complete-trajectory.
            let completion = match engine.complete_trajectory(trajectory_id, &input.account_id, None) {
                Ok(c) => c,
                Err(e) => { yield OrchestratorEvent::error(e.to_string()); return; }
            };

            // S11: persist-assistant-message.
            let message_id = match persist_message(
                &store,
                conversation_id,
                MessageRole::Assistant,
                &full_content,
                Some(trajectory_id),
            ) {
                Ok(id) => id,
                Err(e) => { yield OrchestratorEvent::error(e.to_string()); return; }
            };

            // S12: emit-complete.
            yield OrchestratorEvent::Complete(CompletePayload {
                conversation_id,
                message_id,
                trajectory_id,
                trajectory: completion,
            });
        };

        Box::pin(stream)
    }
}

fn ensure_conversation(
    store: &Arc<dyn Store>,
    account_id: &AccountId,
    conversation_id: Option<ConversationId>,
) -> Result<ConversationId, StoreError> {
    match conversation_id {
        Some(id) => {
            store
                .get_conversation(id)?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "conversation",
                    id: id.to_string(),
                })?;
            Ok(id)
        }
        None => {
            let now = Utc::now();
            let conversation = Conversation {
                id: ConversationId::now_v7(),
                account_id: account_id.clone(),
                title: None,
                created_at: now,
                updated_at: now,
            };
            store.insert_conversation(conversation.clone())?;
            Ok(conversation.id)
        }
    }
}

fn persist_message(
    store: &Arc<dyn Store>,
    conversation_id: ConversationId,
    role: MessageRole,
    content: &str,
    trajectory_id: Option<TrajectoryId>,
) -> Result<MessageId, StoreError> {
    let message = Message {
        id: MessageId::now_v7(),
        conversation_id,
        role,
        content: content.to_string(),
        trajectory_id,
        created_at: Utc::now(),
    };
    store.insert_message(message.clone())?;
    Ok(message.id)
}
