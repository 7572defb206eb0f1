//! [`StateGraph`] - the graph construction API.

use crate::compiled::CompiledGraph;
use crate::error::{GraphError, Result};
use crate::graph::{EdgeRouter, Graph, NodeFuture, NodeId, NodeSpec};
use std::sync::Arc;

/// Builder for state graphs.
///
/// Collects nodes and edges, then [`compile`](Self::compile)s them into an
/// executable [`CompiledGraph`]. The state type `S` flows through every node
/// executor by value.
pub struct StateGraph<S> {
    graph: Graph<S>,
}

impl<S> StateGraph<S> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
        }
    }

    /// Add a node from an async closure.
    ///
    /// The closure receives the current state by value and returns the
    /// successor state as a boxed future.
    pub fn add_node<F>(&mut self, id: impl Into<NodeId>, executor: F) -> &mut Self
    where
        F: Fn(S) -> NodeFuture<S> + Send + Sync + 'static,
    {
        let id = id.into();
        self.graph.add_node(
            id.clone(),
            NodeSpec {
                name: id,
                executor: Arc::new(executor),
            },
        );
        self
    }

    /// Add a direct edge `from -> to`.
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> &mut Self {
        self.graph.add_edge(from.into(), to.into());
        self
    }

    /// Add a conditional edge on `from`.
    ///
    /// `branches` must list every `(label, target)` the router can pick
    /// (used for validation and visualization); the router returns
    /// [`END`](crate::graph::END) for "no match".
    pub fn add_conditional_edge(
        &mut self,
        from: impl Into<NodeId>,
        router: EdgeRouter<S>,
        branches: Vec<(String, NodeId)>,
    ) -> &mut Self {
        self.graph.add_conditional_edge(from.into(), router, branches);
        self
    }

    /// Set the node execution starts at.
    pub fn set_entry(&mut self, node: impl Into<NodeId>) -> &mut Self {
        self.graph.set_entry(node.into());
        self
    }

    /// Validate the structure and produce an executable graph.
    pub fn compile(self) -> Result<CompiledGraph<S>> {
        self.graph.validate().map_err(GraphError::Validation)?;
        Ok(CompiledGraph::new(self.graph))
    }
}

impl<S> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}
