//! OpenAI-compatible chat completions client.
//!
//! Works against any endpoint speaking the `/chat/completions` dialect
//! (OpenAI, Doubao, DeepSeek, vLLM, ...). Tool definitions are sent in the
//! request; tool calls come back with JSON-string arguments, which are parsed
//! into values before reaching callers. Thinking-mode and reasoning-effort
//! settings are forwarded as top-level body fields for providers that accept
//! them.

use crate::client::{ChatModel, ChatRequest, ChatResponse, UsageMetadata};
use crate::config::{ModelConfig, ThinkingConfig};
use crate::error::{LlmError, Result};
use crate::provider::ProviderConfig;
use async_trait::async_trait;
use flowgraph::{Message, MessageRole, ToolCall};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat client for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    provider: ProviderConfig,
    model: ModelConfig,
    client: Client,
}

impl OpenAiCompatClient {
    /// Build a client; the HTTP timeout comes from the model configuration.
    pub fn new(provider: ProviderConfig, model: ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(model.effective_timeout_secs()))
            .build()?;
        Ok(Self {
            provider,
            model,
            client,
        })
    }

    fn convert_message(msg: &Message) -> WireMessage {
        WireMessage {
            role: match msg.role {
                MessageRole::System => "system",
                MessageRole::Human => "user",
                MessageRole::Assistant => "assistant",
                MessageRole::Tool => "tool",
            }
            .to_string(),
            content: Some(msg.content.clone()),
            tool_call_id: msg.tool_call_id.clone(),
            tool_calls: msg.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|c| WireToolCall {
                        id: c.id.clone(),
                        kind: "function".to_string(),
                        function: WireFunctionCall {
                            name: c.name.clone(),
                            arguments: c.args.to_string(),
                        },
                    })
                    .collect()
            }),
        }
    }

    fn convert_response(&self, body: WireResponse) -> Result<ChatResponse> {
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedResponse("response has no choices".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                // Arguments arrive as a JSON string; tolerate plain text by
                // wrapping it so a bad model reply cannot fail the turn here.
                let args = serde_json::from_str(&call.function.arguments)
                    .unwrap_or_else(|_| serde_json::json!({ "raw": call.function.arguments }));
                ToolCall {
                    id: call.id,
                    name: call.function.name,
                    args,
                }
            })
            .collect::<Vec<_>>();

        let message = Message::assistant(choice.message.content.unwrap_or_default())
            .with_tool_calls(tool_calls);

        let usage = body.usage.map(|u| UsageMetadata {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(ChatResponse { message, usage })
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.provider.base_url);

        let messages: Vec<WireMessage> =
            request.messages.iter().map(Self::convert_message).collect();

        let tools = if request.config.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .config
                    .tools
                    .iter()
                    .map(|t| WireTool {
                        kind: "function".to_string(),
                        function: WireFunction {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        },
                    })
                    .collect(),
            )
        };

        let body = WireRequest {
            model: self.model.name.clone(),
            messages,
            temperature: request.config.temperature.or(Some(self.model.temperature)),
            tools,
            thinking: request.config.thinking.or(self.model.thinking),
            reasoning_effort: request
                .config
                .reasoning_effort
                .or(self.model.reasoning_effort)
                .map(|e| format!("{e:?}").to_lowercase()),
        };

        tracing::debug!(
            provider = %self.provider.name,
            model = %self.model.name,
            messages = body.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.provider.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::Authentication(text),
                429 => LlmError::RateLimited(text),
                _ => LlmError::Provider(format!("{status}: {text}")),
            });
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        self.convert_response(wire)
    }
}

// Wire format structs.

#[derive(Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: String,
    function: WireFunction,
}

#[derive(Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
