//! The chat turn entry point.
//!
//! One call to [`ChatService::chat`] is one turn: resolve the session's flow,
//! assemble the initial [`FlowState`], bind the ambient turn context, invoke
//! the compiled graph under the per-turn timeout, extract the reply, and
//! persist the reduced conversation.
//!
//! Failure policy follows the rest of the engine: precondition violations
//! (missing contexts, unknown flows, broken definitions) are errors for the
//! caller; anything that goes wrong during execution degrades into the
//! apology reply and is logged.

use crate::context::{ContextManager, TurnContext};
use crate::error::{OrchestratorError, Result};
use crate::flows::FlowManager;
use crate::state::FlowState;
use chrono::Local;
use flowgraph::Message;
use flowgraph_checkpoint::CheckpointConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Reply used whenever the flow produced no usable assistant message.
pub const DEFAULT_APOLOGY: &str =
    "Sorry, I could not produce a reply this time. Please try again.";

/// One prior conversation entry as callers submit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `user` or `assistant`; other roles are ignored.
    pub role: String,
    pub content: String,
}

/// Input of one chat turn.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatTurnRequest {
    pub message: String,
    pub session_id: String,
    pub token_id: String,
    #[serde(default)]
    pub trace_id: Option<String>,
    /// Optional flow override; defaults to the session's bound flow.
    #[serde(default)]
    pub flow_name: Option<String>,
    /// Caller-provided history overriding the persisted conversation.
    #[serde(default)]
    pub conversation_history: Option<Vec<ChatMessage>>,
    /// Profile override for this turn.
    #[serde(default)]
    pub user_info: Option<Value>,
    /// Date override injected as `current_date`.
    #[serde(default)]
    pub current_date: Option<String>,
}

/// Output of one chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurnResponse {
    pub response: String,
    pub session_id: String,
}

/// Runs chat turns against compiled flows.
pub struct ChatService {
    flows: Arc<FlowManager>,
    contexts: Arc<ContextManager>,
    turn_timeout: Duration,
}

impl ChatService {
    /// Wire the service.
    pub fn new(flows: Arc<FlowManager>, contexts: Arc<ContextManager>, turn_timeout: Duration) -> Self {
        Self {
            flows,
            contexts,
            turn_timeout,
        }
    }

    /// Execute one turn.
    pub async fn chat(&self, request: ChatTurnRequest) -> Result<ChatTurnResponse> {
        let session = self.contexts.get_session(&request.session_id).ok_or_else(|| {
            OrchestratorError::ContextNotFound(format!(
                "session '{}' does not exist; create a session first",
                request.session_id
            ))
        })?;
        let token = self.contexts.get_token(&request.token_id).ok_or_else(|| {
            OrchestratorError::ContextNotFound(format!(
                "token '{}' does not exist; create a token first",
                request.token_id
            ))
        })?;

        let flow_key = request
            .flow_name
            .clone()
            .unwrap_or_else(|| session.flow_info.flow_key.clone());
        let graph = self.flows.get_flow(&flow_key).await?;

        let trace_id = request
            .trace_id
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(generate_trace_id);

        tracing::info!(
            session_id = %request.session_id,
            token_id = %request.token_id,
            trace_id = %trace_id,
            flow = %flow_key,
            message_len = request.message.len(),
            "Chat turn started"
        );

        let checkpoint = CheckpointConfig::new(request.session_id.clone());

        let history = match &request.conversation_history {
            Some(history) => convert_history(history),
            None => match graph.get_state(&checkpoint).await {
                Ok(Some(persisted)) => persisted.history_messages,
                Ok(None) => Vec::new(),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load persisted history, starting fresh");
                    Vec::new()
                }
            },
        };

        let current_date = request.current_date.clone().unwrap_or_else(|| {
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
        });
        let user_info = request
            .user_info
            .clone()
            .or_else(|| token.user_info.clone())
            .unwrap_or(Value::Null);

        let mut prompt_vars = HashMap::new();
        prompt_vars.insert("current_date".to_string(), Value::String(current_date));
        prompt_vars.insert("user_info".to_string(), user_info);

        let current_message = Message::human(request.message.clone());
        let initial_state = FlowState {
            current_message: Some(current_message.clone()),
            history_messages: history,
            flow_msgs: Vec::new(),
            session_id: request.session_id.clone(),
            token_id: Some(request.token_id.clone()),
            trace_id: Some(trace_id.clone()),
            intent: None,
            confidence: None,
            need_clarification: None,
            prompt_vars,
            edges_var: HashMap::new(),
        };

        let turn_context = TurnContext::new(
            request.token_id.clone(),
            request.session_id.clone(),
            trace_id.clone(),
        );

        let execution = turn_context.scope(tokio::time::timeout(
            self.turn_timeout,
            graph.invoke_with_config(initial_state, Some(checkpoint.clone())),
        ));

        let response = match execution.await {
            Ok(Ok(final_state)) => {
                let reply = final_state
                    .last_flow_reply()
                    .map(|m| m.content.clone())
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_APOLOGY.to_string());

                self.persist_turn(&graph, &checkpoint, final_state, current_message, &reply)
                    .await;
                reply
            }
            Ok(Err(e)) => {
                tracing::error!(trace_id = %trace_id, error = %e, "Graph execution failed");
                DEFAULT_APOLOGY.to_string()
            }
            Err(_) => {
                tracing::error!(
                    trace_id = %trace_id,
                    timeout_secs = self.turn_timeout.as_secs(),
                    "Chat turn timed out, partial output discarded"
                );
                DEFAULT_APOLOGY.to_string()
            }
        };

        tracing::info!(
            session_id = %request.session_id,
            trace_id = %trace_id,
            response_len = response.len(),
            "Chat turn finished"
        );

        Ok(ChatTurnResponse {
            response,
            session_id: request.session_id,
        })
    }

    /// Rewrite the persisted conversation: history grows by exactly the user
    /// message and the final assistant reply; per-turn scratch is dropped.
    async fn persist_turn(
        &self,
        graph: &flowgraph::CompiledGraph<FlowState>,
        checkpoint: &CheckpointConfig,
        mut final_state: FlowState,
        current_message: Message,
        reply: &str,
    ) {
        final_state.history_messages.push(current_message);
        final_state
            .history_messages
            .push(Message::assistant(reply.to_string()));
        final_state.current_message = None;
        final_state.flow_msgs.clear();
        final_state.edges_var.clear();

        if let Err(e) = graph.update_state(checkpoint, &final_state).await {
            tracing::warn!(error = %e, "Failed to persist conversation checkpoint");
        }
    }
}

/// 32 lowercase hex characters.
fn generate_trace_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn convert_history(history: &[ChatMessage]) -> Vec<Message> {
    history
        .iter()
        .filter_map(|msg| match msg.role.as_str() {
            "user" => Some(Message::human(msg.content.clone())),
            "assistant" => Some(Message::assistant(msg.content.clone())),
            other => {
                tracing::debug!(role = other, "Skipping history entry with unknown role");
                None
            }
        })
        .collect()
}
