//! Model configuration types.
//!
//! [`ModelConfig`] is the `model:` block of an agent node in flow YAML. It is
//! deserialized with serde and then validated explicitly with
//! [`ModelConfig::validate`]; the thinking-mode / reasoning-effort coupling
//! cannot be expressed structurally, so it lives in the validate method.

use crate::client::ToolDefinition;
use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};

/// Default sampling temperature when a node does not set one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Timeout applied when thinking is enabled and no timeout is configured.
pub const THINKING_TIMEOUT_SECS: u64 = 1800;

/// Fallback request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Thinking mode for models with extended-reasoning support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingMode {
    /// Extended reasoning on.
    Enabled,
    /// Extended reasoning off.
    Disabled,
    /// Provider decides.
    Auto,
}

/// The `thinking:` sub-block of a model configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkingConfig {
    /// Thinking mode.
    #[serde(rename = "type")]
    pub mode: ThinkingMode,
}

/// Reasoning effort hint for thinking models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

/// Per-node model settings from flow YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider name resolved through the provider registry.
    pub provider: String,

    /// Model name as the provider knows it.
    pub name: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Optional thinking-mode configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingConfig>,

    /// Optional reasoning effort hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,

    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

impl ModelConfig {
    /// Validate cross-field constraints.
    ///
    /// `thinking.type = disabled` forces `reasoning_effort = minimal`;
    /// `thinking.type = enabled` forbids `minimal`.
    pub fn validate(&self) -> Result<()> {
        if let (Some(thinking), Some(effort)) = (&self.thinking, &self.reasoning_effort) {
            match thinking.mode {
                ThinkingMode::Disabled if *effort != ReasoningEffort::Minimal => {
                    return Err(LlmError::InvalidConfig(format!(
                        "thinking.type = 'disabled' requires reasoning_effort = 'minimal', got '{:?}'",
                        effort
                    )));
                }
                ThinkingMode::Enabled if *effort == ReasoningEffort::Minimal => {
                    return Err(LlmError::InvalidConfig(
                        "thinking.type = 'enabled' is incompatible with reasoning_effort = 'minimal'"
                            .to_string(),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Whether thinking is explicitly enabled.
    pub fn thinking_enabled(&self) -> bool {
        matches!(
            self.thinking,
            Some(ThinkingConfig {
                mode: ThinkingMode::Enabled
            })
        )
    }

    /// Effective request timeout: the explicit value, else the long thinking
    /// default when thinking is enabled, else the provider default.
    pub fn effective_timeout_secs(&self) -> u64 {
        match self.timeout {
            Some(secs) => secs,
            None if self.thinking_enabled() => THINKING_TIMEOUT_SECS,
            None => DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Generation settings attached to a single request.
#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Tools the model may call.
    pub tools: Vec<ToolDefinition>,

    /// Thinking-mode passthrough.
    pub thinking: Option<ThinkingConfig>,

    /// Reasoning effort passthrough.
    pub reasoning_effort: Option<ReasoningEffort>,
}
