//! [`FlowState`] - the state record threaded through a flow turn.

use flowgraph::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Per-turn flow state.
///
/// Created at turn entry, mutated by nodes (additively), discarded at turn
/// exit. Two rules hold throughout a turn: `history_messages` is never
/// touched by nodes (the chat service rewrites it after the turn), and
/// `flow_msgs` only grows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowState {
    /// The single new human message for this turn.
    pub current_message: Option<Message>,

    /// Prior conversation, in order. Read-only within a turn.
    #[serde(default)]
    pub history_messages: Vec<Message>,

    /// Intermediate assistant/tool outputs produced during this turn.
    #[serde(default)]
    pub flow_msgs: Vec<Message>,

    /// Session this turn belongs to.
    #[serde(default)]
    pub session_id: String,

    /// Caller identity for tool scoping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,

    /// Trace id for observability correlation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// Recognized intent, when an intent node has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    /// Intent confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Whether the intent node asked for clarification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_clarification: Option<bool>,

    /// Variables substituted into agent system prompts at turn time.
    #[serde(default)]
    pub prompt_vars: HashMap<String, Value>,

    /// Scalars read by edge-condition expressions.
    #[serde(default)]
    pub edges_var: HashMap<String, Value>,
}

impl FlowState {
    /// Build the message list an agent node sends to the model:
    /// history followed by the current human message.
    pub fn conversation(&self) -> Vec<Message> {
        let mut msgs = self.history_messages.clone();
        if let Some(current) = &self.current_message {
            msgs.push(current.clone());
        }
        msgs
    }

    /// The last assistant message accumulated this turn, if any.
    pub fn last_flow_reply(&self) -> Option<&Message> {
        flowgraph::messages::last_assistant(&self.flow_msgs)
    }
}
