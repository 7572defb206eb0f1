//! Flow graph construction.
//!
//! [`GraphBuilder`] materializes a [`FlowDefinition`] into a
//! `StateGraph<FlowState>`: one node function per node definition, one
//! (direct or conditional) edge group per source node, entry point set from
//! the definition.
//!
//! Node semantics:
//!
//! - **agent**: compose the system message from the cached template and the
//!   turn's prompt variables, run the ReAct executor over history + current
//!   message, append the final assistant message to `flow_msgs`. A node
//!   named `intent_recognition` additionally parses the reply for a JSON
//!   payload and publishes `intent` / `confidence` / `need_clarification`
//!   (plus optional `query_text` / `keywords`) into `edges_var`. Model
//!   failures degrade the turn instead of aborting it.
//! - **retrieval**: embed the query (from `edges_var`, falling back to the
//!   current human message), search the vector store, and write the
//!   formatted examples into `prompt_vars["retrieved_examples"]`. Any
//!   failure writes the no-examples fallback.

use crate::agents::AgentFactory;
use crate::error::{OrchestratorError, Result};
use crate::flows::condition::ConditionEvaluator;
use crate::flows::definition::{
    EdgeDefinition, FlowDefinition, NodeDefinition, NodeKind, RetrievalNodeConfig, TERMINAL,
};
use crate::prompts::{build_system_message, PromptManager};
use crate::rag::{format_retrieved_examples, Retriever, NO_EXAMPLES};
use crate::state::FlowState;
use crate::tools::ToolRegistry;
use flowgraph::{EdgeRouter, Message, MessageRole, StateGraph, END};
use llm::ChatModelFactory;
use serde_json::Value;
use std::sync::Arc;

/// Node name that triggers intent extraction on agent output.
pub const INTENT_NODE_NAME: &str = "intent_recognition";

/// Builds executable graphs from flow definitions.
pub struct GraphBuilder {
    prompts: Arc<PromptManager>,
    tools: Arc<ToolRegistry>,
    models: Arc<dyn ChatModelFactory>,
    retriever: Arc<Retriever>,
}

impl GraphBuilder {
    /// Create a builder over the shared engine services.
    pub fn new(
        prompts: Arc<PromptManager>,
        tools: Arc<ToolRegistry>,
        models: Arc<dyn ChatModelFactory>,
        retriever: Arc<Retriever>,
    ) -> Self {
        Self {
            prompts,
            tools,
            models,
            retriever,
        }
    }

    /// Materialize `flow_def` into a state graph ready to compile.
    pub fn build(&self, flow_def: &FlowDefinition) -> Result<StateGraph<FlowState>> {
        let mut graph = StateGraph::new();

        for node in &flow_def.nodes {
            match node.kind {
                NodeKind::Agent => self.add_agent_node(&mut graph, node, flow_def)?,
                NodeKind::Retrieval => self.add_retrieval_node(&mut graph, node, flow_def)?,
            }
        }

        self.add_edges(&mut graph, flow_def)?;
        graph.set_entry(flow_def.entry_node.clone());

        tracing::info!(flow = %flow_def.name, "Built flow graph");
        Ok(graph)
    }

    fn add_agent_node(
        &self,
        graph: &mut StateGraph<FlowState>,
        node: &NodeDefinition,
        flow_def: &FlowDefinition,
    ) -> Result<()> {
        let config = node
            .agent_config()
            .map_err(|error| OrchestratorError::FlowCompile {
                flow: flow_def.name.clone(),
                error,
            })?;

        let executor = Arc::new(AgentFactory::create_agent(
            &config,
            &flow_def.flow_dir,
            &self.prompts,
            &self.tools,
            self.models.as_ref(),
            Vec::new(),
        )?);

        let prompts = self.prompts.clone();
        let node_name = node.name.clone();

        graph.add_node(node.name.clone(), move |mut state: FlowState| {
            let executor = executor.clone();
            let prompts = prompts.clone();
            let node_name = node_name.clone();

            Box::pin(async move {
                let msgs = state.conversation();
                if msgs.is_empty() {
                    tracing::warn!(node = %node_name, "No messages to send, skipping node");
                    return Ok(state);
                }

                let sys_msg =
                    match build_system_message(&prompts, &executor.prompt_cache_key, &state.prompt_vars)
                    {
                        Ok(msg) => Some(msg),
                        Err(e) => {
                            tracing::warn!(node = %node_name, error = %e, "System message unavailable");
                            None
                        }
                    };

                match executor.invoke(msgs, sys_msg).await {
                    Ok(outcome) => {
                        if node_name == INTENT_NODE_NAME {
                            apply_intent_output(&mut state, &outcome.output);
                        }
                        state.flow_msgs.push(Message::ai(outcome.output));
                        Ok(state)
                    }
                    Err(e) => {
                        // A failed model call degrades the turn; downstream
                        // routing sees unchanged edges_var and falls through.
                        tracing::error!(node = %node_name, error = %e, "Agent node failed, turn degraded");
                        Ok(state)
                    }
                }
            })
        });

        Ok(())
    }

    fn add_retrieval_node(
        &self,
        graph: &mut StateGraph<FlowState>,
        node: &NodeDefinition,
        flow_def: &FlowDefinition,
    ) -> Result<()> {
        let config: RetrievalNodeConfig =
            node.retrieval_config()
                .map_err(|error| OrchestratorError::FlowCompile {
                    flow: flow_def.name.clone(),
                    error,
                })?;

        let retriever = self.retriever.clone();
        let node_name = node.name.clone();

        graph.add_node(node.name.clone(), move |mut state: FlowState| {
            let retriever = retriever.clone();
            let config = config.clone();
            let node_name = node_name.clone();

            Box::pin(async move {
                let formatted = run_retrieval(&retriever, &config, &state, &node_name).await;
                state
                    .prompt_vars
                    .insert("retrieved_examples".to_string(), Value::String(formatted));
                Ok(state)
            })
        });

        Ok(())
    }

    fn add_edges(&self, graph: &mut StateGraph<FlowState>, flow_def: &FlowDefinition) -> Result<()> {
        // Group edges by source, preserving declaration order within a group.
        let mut sources: Vec<String> = Vec::new();
        for edge in &flow_def.edges {
            if !sources.contains(&edge.from_node) {
                sources.push(edge.from_node.clone());
            }
        }

        for from in sources {
            let outgoing: Vec<EdgeDefinition> = flow_def
                .edges
                .iter()
                .filter(|e| e.from_node == from)
                .cloned()
                .collect();

            let has_always = outgoing.iter().any(|e| e.is_always());
            let has_conditional = outgoing.iter().any(|e| !e.is_always());

            if has_always && has_conditional {
                return Err(OrchestratorError::FlowCompile {
                    flow: flow_def.name.clone(),
                    error: format!("node '{from}' mixes 'always' and conditional edges"),
                });
            }

            if has_conditional {
                // Branch labels carry the condition text so flow previews
                // show the guard on each dashed edge.
                let branches: Vec<(String, String)> = outgoing
                    .iter()
                    .map(|e| (e.condition.clone(), map_target(&e.to_node)))
                    .collect();

                let edges = outgoing.clone();
                let router: EdgeRouter<FlowState> = Arc::new(move |state: &FlowState| {
                    for edge in &edges {
                        if ConditionEvaluator::evaluate(&edge.condition, &state.edges_var) {
                            return map_target(&edge.to_node);
                        }
                    }
                    END.to_string()
                });

                graph.add_conditional_edge(from, router, branches);
            } else {
                // Validation guarantees exactly one 'always' edge here.
                graph.add_edge(from, map_target(&outgoing[0].to_node));
            }
        }

        Ok(())
    }
}

/// Map a YAML edge target onto the engine's node id space.
fn map_target(to_node: &str) -> String {
    if to_node == TERMINAL {
        END.to_string()
    } else {
        to_node.to_string()
    }
}

/// Extract the first `{...}` JSON object from free-form model output.
///
/// First-brace/last-brace heuristic: prose containing a stray `}` after the
/// payload breaks parsing, in which case the caller falls back to defaults.
pub fn extract_intent_payload(output: &str) -> Option<Value> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&output[start..=end]).ok()
}

/// Publish intent-recognition output into the state.
///
/// Missing or unparseable payloads yield `intent = "unclear"`,
/// `confidence = 0.0`, `need_clarification = false`. When the payload also
/// carries `query_text` / `keywords`, they are forwarded for downstream
/// retrieval nodes.
fn apply_intent_output(state: &mut FlowState, output: &str) {
    let payload = extract_intent_payload(output);

    let intent = payload
        .as_ref()
        .and_then(|p| p.get("intent"))
        .and_then(|v| v.as_str())
        .unwrap_or("unclear")
        .to_string();
    let confidence = payload
        .as_ref()
        .and_then(|p| p.get("confidence"))
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let need_clarification = payload
        .as_ref()
        .and_then(|p| p.get("need_clarification"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    tracing::debug!(intent = %intent, confidence, need_clarification, "Intent recognized");

    state.intent = Some(intent.clone());
    state.confidence = Some(confidence);
    state.need_clarification = Some(need_clarification);

    state
        .edges_var
        .insert("intent".to_string(), Value::String(intent));
    state.edges_var.insert(
        "confidence".to_string(),
        serde_json::Number::from_f64(confidence)
            .map(Value::Number)
            .unwrap_or(Value::Null),
    );
    state.edges_var.insert(
        "need_clarification".to_string(),
        Value::Bool(need_clarification),
    );

    if let Some(payload) = payload {
        if let Some(query_text) = payload.get("query_text").and_then(|v| v.as_str()) {
            state
                .edges_var
                .insert("query_text".to_string(), Value::String(query_text.to_string()));
        }
        if let Some(keywords) = payload.get("keywords").filter(|v| v.is_array()) {
            state
                .edges_var
                .insert("keywords".to_string(), keywords.clone());
        }
    }
}

/// Run one retrieval step; every failure path degrades to the fallback text.
async fn run_retrieval(
    retriever: &Retriever,
    config: &RetrievalNodeConfig,
    state: &FlowState,
    node_name: &str,
) -> String {
    let query_text = state
        .edges_var
        .get("query_text")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .or_else(|| {
            state
                .current_message
                .as_ref()
                .map(|m| m.content.clone())
                .filter(|s| !s.trim().is_empty())
        })
        .or_else(|| {
            state
                .history_messages
                .iter()
                .rev()
                .find(|m| m.role == MessageRole::Human)
                .map(|m| m.content.clone())
        })
        .unwrap_or_default();

    if query_text.trim().is_empty() {
        tracing::warn!(node = node_name, "Empty retrieval query, using fallback");
        return NO_EXAMPLES.to_string();
    }

    let keywords: Vec<String> = state
        .edges_var
        .get("keywords")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    match retriever
        .search(
            &query_text,
            &keywords,
            config.tables.as_deref(),
            config.top_k,
            config.min_results,
        )
        .await
    {
        Ok(results) => {
            tracing::debug!(node = node_name, count = results.len(), "Retrieval finished");
            format_retrieved_examples(&results)
        }
        Err(e) => {
            tracing::error!(node = node_name, error = %e, "Retrieval failed, using fallback");
            NO_EXAMPLES.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_extraction_finds_embedded_object() {
        let output = "Sure, here is the result: {\"intent\": \"record_blood_pressure\", \"confidence\": 0.92} hope that helps";
        let payload = extract_intent_payload(output).unwrap();
        assert_eq!(payload["intent"], json!("record_blood_pressure"));
    }

    #[test]
    fn stray_trailing_brace_defeats_the_heuristic() {
        // Documented lossiness of first-brace/last-brace extraction.
        let output = "{\"intent\": \"chat\"} and by the way }";
        assert!(extract_intent_payload(output).is_none());
    }

    #[test]
    fn apply_intent_defaults_on_garbage() {
        let mut state = FlowState::default();
        apply_intent_output(&mut state, "no json here");
        assert_eq!(state.intent.as_deref(), Some("unclear"));
        assert_eq!(state.confidence, Some(0.0));
        assert_eq!(state.need_clarification, Some(false));
        assert_eq!(state.edges_var["intent"], json!("unclear"));
    }

    #[test]
    fn apply_intent_publishes_edges_vars() {
        let mut state = FlowState::default();
        apply_intent_output(
            &mut state,
            r#"{"intent": "query_blood_pressure", "confidence": 0.85, "need_clarification": false, "query_text": "my recent bp", "keywords": ["blood pressure"]}"#,
        );
        assert_eq!(state.edges_var["intent"], json!("query_blood_pressure"));
        assert_eq!(state.edges_var["confidence"], json!(0.85));
        assert_eq!(state.edges_var["query_text"], json!("my recent bp"));
        assert_eq!(state.edges_var["keywords"], json!(["blood pressure"]));
    }

    #[test]
    fn terminal_maps_to_engine_end() {
        assert_eq!(map_target("END"), END);
        assert_eq!(map_target("chat"), "chat");
    }
}
