//! The [`ChatModel`] trait and request/response types.
//!
//! Implementations convert between [`flowgraph::Message`]s and their wire
//! format, make the call, and hand back a [`ChatResponse`]. Tool calling is a
//! first-class concern: requests carry [`ToolDefinition`]s and responses may
//! carry `tool_calls` on the assistant message.

use crate::config::{ChatConfig, ReasoningEffort, ThinkingConfig};
use crate::error::Result;
use async_trait::async_trait;
use flowgraph::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Definition of a tool the model may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,

    /// What the tool does, for the model.
    pub description: String,

    /// JSON Schema of the tool's arguments.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a definition with an empty object schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Set the parameter schema.
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A chat request: conversation messages plus generation settings.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Messages in conversation order.
    pub messages: Vec<Message>,

    /// Generation settings.
    pub config: ChatConfig,
}

impl ChatRequest {
    /// Create a request with default settings.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            config: ChatConfig::default(),
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Bind callable tools.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.config.tools = tools;
        self
    }

    /// Forward a thinking-mode setting to the provider.
    pub fn with_thinking(mut self, thinking: Option<ThinkingConfig>) -> Self {
        self.config.thinking = thinking;
        self
    }

    /// Forward a reasoning-effort setting to the provider.
    pub fn with_reasoning_effort(mut self, effort: Option<ReasoningEffort>) -> Self {
        self.config.reasoning_effort = effort;
        self
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    /// Tokens in the prompt.
    pub input_tokens: u64,

    /// Tokens generated.
    pub output_tokens: u64,
}

/// A complete model response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// The assistant message; `tool_calls` is set when the model wants tools run.
    pub message: Message,

    /// Token usage when the provider reports it.
    pub usage: Option<UsageMetadata>,
}

/// Provider-agnostic chat interface.
///
/// Implementations must be `Send + Sync`; graph nodes share them behind
/// `Arc<dyn ChatModel>`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate one response for the given request.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}
