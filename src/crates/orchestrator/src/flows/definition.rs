//! Flow definition model.
//!
//! These types mirror the flow YAML schema. Structural invariants that serde
//! cannot express live in [`FlowDefinition::validate`], which the parser runs
//! before a definition is accepted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;

/// Edge target marking flow termination in YAML.
pub const TERMINAL: &str = "END";

/// Condition string of an unconditional edge.
pub const ALWAYS: &str = "always";

/// Kind of a flow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// LLM-backed ReAct agent.
    Agent,
    /// RAG retrieval step.
    Retrieval,
}

/// Configuration of an `agent` node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentNodeConfig {
    /// Template path, relative to the flow directory.
    pub prompt: String,

    /// Model settings.
    pub model: llm::ModelConfig,

    /// Names of registered tools bound to this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

/// Configuration of a `retrieval` node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalNodeConfig {
    /// Tables to search; defaults to every example table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,

    /// Global result cap after merging.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum merged results before threshold fallback stops.
    #[serde(default = "default_min_results")]
    pub min_results: usize,
}

fn default_top_k() -> usize {
    15
}

fn default_min_results() -> usize {
    5
}

/// One node of a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Node name, unique within the flow.
    pub name: String,

    /// Node kind.
    #[serde(rename = "type")]
    pub kind: NodeKind,

    /// Kind-specific configuration, interpreted when the graph is built.
    pub config: Value,
}

impl NodeDefinition {
    /// Parse this node's config as an agent configuration.
    pub fn agent_config(&self) -> Result<AgentNodeConfig, String> {
        serde_json::from_value(self.config.clone())
            .map_err(|e| format!("node '{}': invalid agent config: {e}", self.name))
    }

    /// Parse this node's config as a retrieval configuration.
    pub fn retrieval_config(&self) -> Result<RetrievalNodeConfig, String> {
        serde_json::from_value(self.config.clone())
            .map_err(|e| format!("node '{}': invalid retrieval config: {e}", self.name))
    }
}

/// One edge of a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDefinition {
    /// Source node name.
    #[serde(rename = "from")]
    pub from_node: String,

    /// Target node name, or [`TERMINAL`].
    #[serde(rename = "to")]
    pub to_node: String,

    /// `always`, or a boolean expression over `edges_var`.
    pub condition: String,
}

impl EdgeDefinition {
    /// Whether this edge is unconditional.
    pub fn is_always(&self) -> bool {
        self.condition.trim() == ALWAYS
    }
}

/// A complete flow definition, loaded once from disk and immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDefinition {
    /// Unique flow name.
    pub name: String,

    /// Flow version string.
    #[serde(default = "default_version")]
    pub version: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Name of the node execution starts at.
    pub entry_node: String,

    /// Nodes, in declaration order.
    pub nodes: Vec<NodeDefinition>,

    /// Edges, in declaration order (order matters for conditional routing).
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,

    /// Directory the flow was loaded from; resolves template references.
    #[serde(skip)]
    pub flow_dir: PathBuf,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl FlowDefinition {
    /// Check the structural invariants serde cannot enforce.
    ///
    /// - nodes are non-empty with unique names
    /// - `entry_node` names an existing node
    /// - every edge endpoint names an existing node (or [`TERMINAL`])
    /// - per source node, edges are either exactly one `always` edge or one
    ///   or more conditional edges, never a mix
    /// - node configs parse for their kind, including model validation
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("flow has no nodes".to_string());
        }

        let mut names = HashSet::new();
        for node in &self.nodes {
            if !names.insert(node.name.as_str()) {
                return Err(format!("duplicate node name '{}'", node.name));
            }
        }

        if !names.contains(self.entry_node.as_str()) {
            return Err(format!(
                "entry_node '{}' is not a declared node",
                self.entry_node
            ));
        }

        for edge in &self.edges {
            if !names.contains(edge.from_node.as_str()) {
                return Err(format!(
                    "edge source '{}' is not a declared node",
                    edge.from_node
                ));
            }
            if edge.to_node != TERMINAL && !names.contains(edge.to_node.as_str()) {
                return Err(format!(
                    "edge target '{}' is not a declared node",
                    edge.to_node
                ));
            }
        }

        for node in &self.nodes {
            let outgoing: Vec<&EdgeDefinition> = self
                .edges
                .iter()
                .filter(|e| e.from_node == node.name)
                .collect();
            let always = outgoing.iter().filter(|e| e.is_always()).count();
            let conditional = outgoing.len() - always;

            if always > 0 && conditional > 0 {
                return Err(format!(
                    "node '{}' mixes 'always' and conditional edges",
                    node.name
                ));
            }
            if always > 1 {
                return Err(format!(
                    "node '{}' has {} 'always' edges; at most one is allowed",
                    node.name, always
                ));
            }
        }

        for node in &self.nodes {
            match node.kind {
                NodeKind::Agent => {
                    let config = node.agent_config()?;
                    config
                        .model
                        .validate()
                        .map_err(|e| format!("node '{}': {e}", node.name))?;
                }
                NodeKind::Retrieval => {
                    node.retrieval_config()?;
                }
            }
        }

        Ok(())
    }

    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&NodeDefinition> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn agent_node(name: &str) -> NodeDefinition {
        NodeDefinition {
            name: name.to_string(),
            kind: NodeKind::Agent,
            config: json!({
                "prompt": "prompts/a.md",
                "model": {"provider": "doubao", "name": "m"}
            }),
        }
    }

    fn edge(from: &str, to: &str, condition: &str) -> EdgeDefinition {
        EdgeDefinition {
            from_node: from.to_string(),
            to_node: to.to_string(),
            condition: condition.to_string(),
        }
    }

    fn flow(nodes: Vec<NodeDefinition>, edges: Vec<EdgeDefinition>) -> FlowDefinition {
        FlowDefinition {
            name: "test_flow".to_string(),
            version: "1.0".to_string(),
            description: None,
            entry_node: nodes[0].name.clone(),
            nodes,
            edges,
            flow_dir: PathBuf::new(),
        }
    }

    #[test]
    fn valid_flow_passes() {
        let f = flow(
            vec![agent_node("a"), agent_node("b")],
            vec![
                edge("a", "b", "intent == 'x'"),
                edge("a", TERMINAL, "intent == 'y'"),
                edge("b", TERMINAL, "always"),
            ],
        );
        assert!(f.validate().is_ok());
    }

    #[test]
    fn entry_node_must_exist() {
        let mut f = flow(vec![agent_node("a")], vec![]);
        f.entry_node = "ghost".to_string();
        assert!(f.validate().unwrap_err().contains("entry_node"));
    }

    #[test]
    fn duplicate_node_names_rejected() {
        let f = flow(vec![agent_node("a"), agent_node("a")], vec![]);
        assert!(f.validate().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn dangling_edge_target_rejected() {
        let f = flow(vec![agent_node("a")], vec![edge("a", "ghost", "always")]);
        assert!(f.validate().unwrap_err().contains("edge target"));
    }

    #[test]
    fn mixed_edge_kinds_rejected() {
        let f = flow(
            vec![agent_node("a"), agent_node("b")],
            vec![
                edge("a", "b", "always"),
                edge("a", TERMINAL, "intent == 'x'"),
            ],
        );
        assert!(f.validate().unwrap_err().contains("mixes"));
    }

    #[test]
    fn multiple_always_edges_rejected() {
        let f = flow(
            vec![agent_node("a"), agent_node("b")],
            vec![edge("a", "b", "always"), edge("a", TERMINAL, "always")],
        );
        assert!(f.validate().unwrap_err().contains("always"));
    }

    #[test]
    fn invalid_model_coupling_is_a_flow_error() {
        let mut node = agent_node("a");
        node.config = json!({
            "prompt": "p.md",
            "model": {
                "provider": "doubao",
                "name": "m",
                "thinking": {"type": "enabled"},
                "reasoning_effort": "minimal"
            }
        });
        let f = flow(vec![node], vec![]);
        assert!(f.validate().is_err());
    }

    #[test]
    fn retrieval_config_defaults_apply() {
        let node = NodeDefinition {
            name: "r".to_string(),
            kind: NodeKind::Retrieval,
            config: json!({}),
        };
        let config = node.retrieval_config().unwrap();
        assert_eq!(config.top_k, 15);
        assert_eq!(config.min_results, 5);
        assert!(config.tables.is_none());
    }
}
