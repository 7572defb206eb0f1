//! # llm - chat model abstractions for careflow
//!
//! careflow is an orchestration system, not an LLM client library. This crate
//! keeps the boundary small:
//!
//! - [`ChatModel`] - the provider-agnostic trait graph nodes call
//! - [`ChatRequest`] / [`ChatResponse`] - messages in, message (+ tool calls) out
//! - [`ToolDefinition`] - function-calling schemas bound per request
//! - [`ModelConfig`] - per-node model settings from flow YAML, with
//!   cross-field validation of thinking mode and reasoning effort
//! - [`ProviderManager`] - provider name → credentials, loaded from env
//! - [`OpenAiCompatClient`] - reqwest client for OpenAI-compatible endpoints
//!
//! Build a client for a node with [`build_chat_model`]:
//!
//! ```rust,ignore
//! let providers = ProviderManager::new();
//! let config: ModelConfig = serde_yaml::from_str(node_model_yaml)?;
//! config.validate()?;
//! let model = build_chat_model(&config, &providers)?;
//! let response = model.chat(ChatRequest::new(messages)).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod remote;

pub use client::{ChatModel, ChatRequest, ChatResponse, ToolDefinition, UsageMetadata};
pub use config::{ChatConfig, ModelConfig, ReasoningEffort, ThinkingConfig, ThinkingMode};
pub use error::LlmError;
pub use provider::{
    build_chat_model, ChatModelFactory, ProviderChatModelFactory, ProviderConfig, ProviderManager,
};
pub use remote::OpenAiCompatClient;
