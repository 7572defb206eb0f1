//! Low-level graph representation.
//!
//! A [`Graph`] is a set of named nodes plus, per node, at most one outgoing
//! edge: either a [`Edge::Direct`] transition or a [`Edge::Conditional`]
//! router that inspects the state and names the next node. The sentinels
//! [`START`] and [`END`] mark entry and termination; routers return [`END`]
//! when no branch applies.

use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Node identifier type.
pub type NodeId = String;

/// Virtual entry node.
pub const START: &str = "__start__";

/// Virtual terminal node.
pub const END: &str = "__end__";

/// Future returned by a node executor.
pub type NodeFuture<S> = Pin<Box<dyn Future<Output = Result<S>> + Send>>;

/// Async node function: consumes the state, returns the successor state.
pub type NodeExecutor<S> = Arc<dyn Fn(S) -> NodeFuture<S> + Send + Sync>;

/// Router for conditional edges: inspects the state, names the next node.
pub type EdgeRouter<S> = Arc<dyn Fn(&S) -> NodeId + Send + Sync>;

/// A node: a name plus its executor.
#[derive(Clone)]
pub struct NodeSpec<S> {
    /// Node name, unique within the graph.
    pub name: String,

    /// The async state transition this node performs.
    pub executor: NodeExecutor<S>,
}

impl<S> std::fmt::Debug for NodeSpec<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSpec")
            .field("name", &self.name)
            .field("executor", &"<function>")
            .finish()
    }
}

/// Outgoing edge of a node.
pub enum Edge<S> {
    /// Unconditional transition to a node (or [`END`]).
    Direct(NodeId),

    /// State-dependent transition. `branches` lists every `(label, target)`
    /// pair the router may pick, for validation and visualization; the
    /// router itself returns [`END`] when nothing matches.
    Conditional {
        /// Routing function evaluated against the post-node state.
        router: EdgeRouter<S>,
        /// All possible router outcomes as `(label, target)` pairs.
        branches: Vec<(String, NodeId)>,
    },
}

impl<S> Clone for Edge<S> {
    fn clone(&self) -> Self {
        match self {
            Edge::Direct(to) => Edge::Direct(to.clone()),
            Edge::Conditional { router, branches } => Edge::Conditional {
                router: router.clone(),
                branches: branches.clone(),
            },
        }
    }
}

impl<S> std::fmt::Debug for Edge<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Direct(to) => f.debug_tuple("Direct").field(to).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("router", &"<function>")
                .field("branches", branches)
                .finish(),
        }
    }
}

/// Graph structure: nodes, one outgoing edge per node, and an entry point.
pub struct Graph<S> {
    /// Nodes by name.
    pub nodes: HashMap<NodeId, NodeSpec<S>>,

    /// Outgoing edge per source node.
    pub edges: HashMap<NodeId, Edge<S>>,

    /// Where execution begins. Defaults to [`START`].
    pub entry: NodeId,
}

impl<S> Graph<S> {
    /// Create an empty graph with entry at [`START`].
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: START.to_string(),
        }
    }

    /// Add a node. Replaces any node with the same name.
    pub fn add_node(&mut self, id: NodeId, spec: NodeSpec<S>) {
        self.nodes.insert(id, spec);
    }

    /// Install a direct edge `from -> to`. Replaces any existing edge of `from`.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.edges.insert(from, Edge::Direct(to));
    }

    /// Install a conditional edge on `from`. Replaces any existing edge of `from`.
    pub fn add_conditional_edge(
        &mut self,
        from: NodeId,
        router: EdgeRouter<S>,
        branches: Vec<(String, NodeId)>,
    ) {
        self.edges.insert(from, Edge::Conditional { router, branches });
    }

    /// Set the entry point for execution.
    pub fn set_entry(&mut self, node: NodeId) {
        self.entry = node;
    }

    /// Validate the graph structure.
    ///
    /// Checks that the entry point exists, that every edge source exists, and
    /// that every edge target and conditional branch exists (or is [`END`]).
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.nodes.contains_key(&self.entry) && self.entry != START {
            return Err(format!("Entry point '{}' does not exist", self.entry));
        }

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) && from != START {
                return Err(format!("Edge source '{}' does not exist", from));
            }

            match edge {
                Edge::Direct(to) => {
                    if !self.nodes.contains_key(to) && to != END {
                        return Err(format!("Edge target '{}' does not exist", to));
                    }
                }
                Edge::Conditional { branches, .. } => {
                    for (_, to) in branches {
                        if !self.nodes.contains_key(to) && to != END {
                            return Err(format!("Branch target '{}' does not exist", to));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl<S> Default for Graph<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_spec(name: &str) -> NodeSpec<i64> {
        NodeSpec {
            name: name.to_string(),
            executor: Arc::new(|state| Box::pin(async move { Ok(state) })),
        }
    }

    #[test]
    fn validate_accepts_well_formed_graph() {
        let mut graph: Graph<i64> = Graph::new();
        graph.add_node("a".into(), noop_spec("a"));
        graph.add_node("b".into(), noop_spec("b"));
        graph.add_edge("a".into(), "b".into());
        graph.add_edge("b".into(), END.into());
        graph.set_entry("a".into());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_entry() {
        let mut graph: Graph<i64> = Graph::new();
        graph.add_node("a".into(), noop_spec("a"));
        graph.set_entry("nope".into());
        assert!(graph.validate().is_err());
    }

    #[test]
    fn validate_rejects_dangling_edge_target() {
        let mut graph: Graph<i64> = Graph::new();
        graph.add_node("a".into(), noop_spec("a"));
        graph.add_edge("a".into(), "missing".into());
        graph.set_entry("a".into());
        assert!(graph.validate().is_err());
    }

    #[test]
    fn validate_rejects_dangling_branch_target() {
        let mut graph: Graph<i64> = Graph::new();
        graph.add_node("a".into(), noop_spec("a"));
        graph.add_conditional_edge(
            "a".into(),
            Arc::new(|_| END.to_string()),
            vec![("always".to_string(), "missing".to_string())],
        );
        graph.set_entry("a".into());
        assert!(graph.validate().is_err());
    }

    #[test]
    fn validate_accepts_end_branch_targets() {
        let mut graph: Graph<i64> = Graph::new();
        graph.add_node("a".into(), noop_spec("a"));
        graph.add_conditional_edge(
            "a".into(),
            Arc::new(|_| END.to_string()),
            vec![("done".to_string(), END.to_string())],
        );
        graph.set_entry("a".into());
        assert!(graph.validate().is_ok());
    }
}
