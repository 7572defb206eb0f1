//! Agent factory and the ReAct executor.
//!
//! One [`AgentExecutor`] is built per agent node at graph-build time and
//! shared across turns. The system message is NOT baked in: it is composed
//! per turn from the cached template and the turn's prompt variables, then
//! passed to [`AgentExecutor::invoke`].
//!
//! The executor runs the ReAct loop directly: call the model with the
//! conversation plus tool definitions; if the reply carries tool calls,
//! dispatch each against the bound tools (identity flows in through the
//! ambient turn context), append the results as tool messages, and loop.
//! The loop ends when the model answers without tool calls or the iteration
//! limit is reached.

use crate::error::Result;
use crate::flows::definition::AgentNodeConfig;
use crate::prompts::PromptManager;
use crate::tools::{Tool, ToolRegistry};
use flowgraph::{messages::last_assistant, Message};
use llm::{ChatModel, ChatModelFactory, ChatRequest, ToolDefinition};
use std::path::Path;
use std::sync::Arc;

/// Default cap on model→tools round trips per node execution.
const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Result of one agent execution.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// The final assistant text.
    pub output: String,

    /// Full message trace of the loop, system message included.
    pub messages: Vec<Message>,
}

/// A runnable agent: model, bound tools, and its template's cache key.
pub struct AgentExecutor {
    model: Arc<dyn ChatModel>,
    tools: Vec<Arc<Tool>>,
    /// Key of this agent's template in the prompt cache.
    pub prompt_cache_key: String,
    max_iterations: usize,
}

impl AgentExecutor {
    /// Override the ReAct iteration limit.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Run the ReAct loop over `msgs`, with `sys_msg` prepended when given.
    pub async fn invoke(&self, msgs: Vec<Message>, sys_msg: Option<Message>) -> Result<AgentOutcome> {
        let mut messages = Vec::with_capacity(msgs.len() + 1);
        if let Some(sys) = sys_msg {
            messages.push(sys);
        }
        messages.extend(msgs);

        let definitions: Vec<ToolDefinition> =
            self.tools.iter().map(|t| t.definition()).collect();

        for iteration in 0..self.max_iterations {
            let request = ChatRequest::new(messages.clone()).with_tools(definitions.clone());
            let response = self.model.chat(request).await?;
            let reply = response.message;
            messages.push(reply.clone());

            let calls = match &reply.tool_calls {
                Some(calls) if !calls.is_empty() => calls.clone(),
                _ => {
                    return Ok(AgentOutcome {
                        output: reply.content,
                        messages,
                    });
                }
            };

            tracing::debug!(iteration, count = calls.len(), "Dispatching tool calls");
            for call in calls {
                let result = match self.tools.iter().find(|t| t.name == call.name) {
                    Some(tool) => tool.invoke(call.args.clone()).await,
                    None => {
                        tracing::warn!(tool = %call.name, "Model requested an unbound tool");
                        format!("error: tool '{}' is not available", call.name)
                    }
                };
                messages.push(Message::tool(result, call.id));
            }
        }

        tracing::warn!(
            max_iterations = self.max_iterations,
            "Agent hit the iteration limit without a final answer"
        );
        let output = last_assistant(&messages)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(AgentOutcome { output, messages })
    }

    /// Names of the tools bound to this agent.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }
}

/// Builds [`AgentExecutor`]s from agent node configurations.
pub struct AgentFactory;

impl AgentFactory {
    /// Create an executor for one agent node.
    ///
    /// Loads and caches the node's template (the returned executor holds the
    /// cache key), resolves tool names against the registry (unknown names
    /// are skipped with a warning), and builds the chat model from the
    /// validated model configuration.
    pub fn create_agent(
        config: &AgentNodeConfig,
        flow_dir: &Path,
        prompts: &PromptManager,
        registry: &ToolRegistry,
        models: &dyn ChatModelFactory,
        extra_tools: Vec<Arc<Tool>>,
    ) -> Result<AgentExecutor> {
        let prompt_cache_key = prompts.cached_prompt(&config.prompt, flow_dir)?;

        let mut tools = Vec::new();
        if let Some(names) = &config.tools {
            for name in names {
                match registry.get(name) {
                    Some(tool) => tools.push(tool),
                    None => {
                        tracing::warn!(tool = %name, "Tool is not registered, skipping");
                    }
                }
            }
        }
        tools.extend(extra_tools);

        config.model.validate()?;
        let model = models.build_model(&config.model)?;

        tracing::debug!(
            prompt = %config.prompt,
            tools = tools.len(),
            provider = %config.model.provider,
            model = %config.model.name,
            "Created agent executor"
        );

        Ok(AgentExecutor {
            model,
            tools,
            prompt_cache_key,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        })
    }
}
