//! [`CompiledGraph`] - the executable form of a graph.
//!
//! Execution walks one active node at a time from the entry point: run the
//! node's executor, follow its outgoing edge (evaluating the router for
//! conditional edges), and stop at [`END`]. A safety step limit guards
//! against cyclic flows that never terminate.

use crate::error::{GraphError, Result};
use crate::graph::{Edge, Graph, END, START};
use flowgraph_checkpoint::{Checkpoint, CheckpointConfig, CheckpointSaver};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Default maximum number of node executions per invoke.
const DEFAULT_STEP_LIMIT: usize = 64;

/// An executable graph with optional checkpoint persistence.
pub struct CompiledGraph<S> {
    graph: Graph<S>,
    checkpointer: Option<Arc<dyn CheckpointSaver>>,
    step_limit: usize,
}

impl<S> CompiledGraph<S> {
    pub(crate) fn new(graph: Graph<S>) -> Self {
        Self {
            graph,
            checkpointer: None,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Attach a checkpoint saver. Final states of checkpointed invocations
    /// are snapshotted per thread.
    pub fn with_checkpointer(mut self, saver: Arc<dyn CheckpointSaver>) -> Self {
        self.checkpointer = Some(saver);
        self
    }

    /// Override the safety step limit.
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Access the underlying graph structure.
    pub fn graph(&self) -> &Graph<S> {
        &self.graph
    }

    /// The attached checkpoint saver, if any.
    pub fn checkpointer(&self) -> Option<&Arc<dyn CheckpointSaver>> {
        self.checkpointer.as_ref()
    }
}

impl<S> CompiledGraph<S>
where
    S: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    /// Execute the graph to completion without checkpointing.
    pub async fn invoke(&self, input: S) -> Result<S> {
        self.invoke_with_config(input, None).await
    }

    /// Execute the graph; when `config` is given and a checkpointer is
    /// attached, the final state is saved under the config's thread.
    pub async fn invoke_with_config(
        &self,
        input: S,
        config: Option<CheckpointConfig>,
    ) -> Result<S> {
        let mut state = input;
        let mut current = self.graph.entry.clone();

        // An entry of START means "follow START's edge to the first node".
        if current == START {
            current = self.next_node(START, &state)?;
        }

        let mut steps = 0usize;
        while current != END {
            let spec = self.graph.nodes.get(&current).ok_or_else(|| {
                GraphError::Execution(format!("Active node '{}' does not exist", current))
            })?;

            tracing::debug!(node = %current, step = steps, "Executing node");
            state = (spec.executor)(state).await.map_err(|e| match e {
                err @ GraphError::NodeExecution { .. } => err,
                other => GraphError::node_execution(current.as_str(), other.to_string()),
            })?;

            steps += 1;
            if steps >= self.step_limit {
                return Err(GraphError::Execution(format!(
                    "Step limit of {} reached at node '{}'",
                    self.step_limit, current
                )));
            }

            current = self.next_node(&current, &state)?;
        }

        if let (Some(saver), Some(cfg)) = (&self.checkpointer, &config) {
            let snapshot = serde_json::to_value(&state)?;
            saver
                .put(Checkpoint::new(cfg.thread_id.clone(), snapshot))
                .await?;
        }

        Ok(state)
    }

    /// Load the latest checkpointed state for a thread, if any.
    pub async fn get_state(&self, config: &CheckpointConfig) -> Result<Option<S>> {
        let Some(saver) = &self.checkpointer else {
            return Ok(None);
        };
        match saver.get_latest(config).await? {
            Some(checkpoint) => Ok(Some(serde_json::from_value(checkpoint.state)?)),
            None => Ok(None),
        }
    }

    /// Overwrite the latest checkpointed state for a thread.
    pub async fn update_state(&self, config: &CheckpointConfig, state: &S) -> Result<()> {
        let Some(saver) = &self.checkpointer else {
            return Err(GraphError::Execution(
                "update_state requires a checkpointer".to_string(),
            ));
        };
        let snapshot = serde_json::to_value(state)?;
        saver
            .put(Checkpoint::new(config.thread_id.clone(), snapshot))
            .await?;
        Ok(())
    }

    /// Resolve the node that follows `from` under the current state.
    fn next_node(&self, from: &str, state: &S) -> Result<String> {
        match self.graph.edges.get(from) {
            None => Ok(END.to_string()),
            Some(Edge::Direct(to)) => Ok(to.clone()),
            Some(Edge::Conditional { router, .. }) => Ok(router(state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateGraph;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Counter {
        value: i64,
        log: Vec<String>,
    }

    impl Counter {
        fn new(value: i64) -> Self {
            Self { value, log: vec![] }
        }
    }

    fn visit(name: &'static str, delta: i64) -> impl Fn(Counter) -> crate::graph::NodeFuture<Counter> {
        move |mut state: Counter| {
            Box::pin(async move {
                state.value += delta;
                state.log.push(name.to_string());
                Ok(state)
            })
        }
    }

    #[tokio::test]
    async fn linear_graph_runs_all_nodes() {
        let mut graph = StateGraph::new();
        graph.add_node("a", visit("a", 1));
        graph.add_node("b", visit("b", 10));
        graph.add_edge("a", "b");
        graph.add_edge("b", END);
        graph.set_entry("a");

        let compiled = graph.compile().unwrap();
        let out = compiled.invoke(Counter::new(0)).await.unwrap();
        assert_eq!(out.value, 11);
        assert_eq!(out.log, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn conditional_edge_routes_by_state() {
        let mut graph = StateGraph::new();
        graph.add_node("check", visit("check", 0));
        graph.add_node("pos", visit("pos", 100));
        graph.add_node("neg", visit("neg", -100));
        graph.add_conditional_edge(
            "check",
            Arc::new(|state: &Counter| {
                if state.value > 0 {
                    "pos".to_string()
                } else {
                    "neg".to_string()
                }
            }),
            vec![
                ("value > 0".to_string(), "pos".to_string()),
                ("otherwise".to_string(), "neg".to_string()),
            ],
        );
        graph.add_edge("pos", END);
        graph.add_edge("neg", END);
        graph.set_entry("check");

        let compiled = graph.compile().unwrap();
        let out = compiled.invoke(Counter::new(5)).await.unwrap();
        assert_eq!(out.log, vec!["check", "pos"]);

        let out = compiled.invoke(Counter::new(-5)).await.unwrap();
        assert_eq!(out.log, vec!["check", "neg"]);
    }

    #[tokio::test]
    async fn node_without_edge_terminates() {
        let mut graph = StateGraph::new();
        graph.add_node("only", visit("only", 1));
        graph.set_entry("only");

        let compiled = graph.compile().unwrap();
        let out = compiled.invoke(Counter::new(0)).await.unwrap();
        assert_eq!(out.value, 1);
    }

    #[tokio::test]
    async fn cyclic_graph_hits_step_limit() {
        let mut graph = StateGraph::new();
        graph.add_node("loop", visit("loop", 1));
        graph.add_edge("loop", "loop");
        graph.set_entry("loop");

        let compiled = graph.compile().unwrap().with_step_limit(8);
        let err = compiled.invoke(Counter::new(0)).await.unwrap_err();
        assert!(matches!(err, GraphError::Execution(_)));
    }

    #[tokio::test]
    async fn node_error_carries_node_name() {
        let mut graph = StateGraph::new();
        graph.add_node("boom", |_state: Counter| {
            Box::pin(async move {
                Err::<Counter, _>(GraphError::Execution("exploded".to_string()))
            })
        });
        graph.set_entry("boom");

        let compiled = graph.compile().unwrap();
        let err = compiled.invoke(Counter::new(0)).await.unwrap_err();
        match err {
            GraphError::NodeExecution { node, .. } => assert_eq!(node, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn checkpointed_invoke_persists_final_state() {
        use flowgraph_checkpoint::InMemoryCheckpointSaver;

        let mut graph = StateGraph::new();
        graph.add_node("a", visit("a", 42));
        graph.add_edge("a", END);
        graph.set_entry("a");

        let saver = Arc::new(InMemoryCheckpointSaver::new());
        let compiled = graph.compile().unwrap().with_checkpointer(saver);

        let config = CheckpointConfig::new("thread-1");
        compiled
            .invoke_with_config(Counter::new(0), Some(config.clone()))
            .await
            .unwrap();

        let restored = compiled.get_state(&config).await.unwrap().unwrap();
        assert_eq!(restored.value, 42);
    }

    #[tokio::test]
    async fn update_state_overwrites_latest() {
        use flowgraph_checkpoint::InMemoryCheckpointSaver;

        let mut graph = StateGraph::new();
        graph.add_node("a", visit("a", 1));
        graph.add_edge("a", END);
        graph.set_entry("a");

        let saver = Arc::new(InMemoryCheckpointSaver::new());
        let compiled = graph.compile().unwrap().with_checkpointer(saver);

        let config = CheckpointConfig::new("thread-1");
        let mut state = Counter::new(7);
        state.log.push("manual".to_string());
        compiled.update_state(&config, &state).await.unwrap();

        let restored = compiled.get_state(&config).await.unwrap().unwrap();
        assert_eq!(restored, state);
    }
}
