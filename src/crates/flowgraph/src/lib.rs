//! # flowgraph - typed state-graph execution
//!
//! A small orchestration engine for graphs whose nodes are async functions
//! over a shared, typed state. Graphs are built with [`StateGraph`], compiled
//! into a [`CompiledGraph`], and executed with `invoke`. Execution follows a
//! single active node at a time: run the node, route along its outgoing edge
//! (direct or conditional), repeat until [`END`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use flowgraph::{StateGraph, END, START};
//!
//! #[derive(Clone, serde::Serialize, serde::Deserialize)]
//! struct State { count: i64 }
//!
//! let mut graph = StateGraph::new();
//! graph.add_node("bump", |mut state: State| {
//!     Box::pin(async move {
//!         state.count += 1;
//!         Ok(state)
//!     })
//! });
//! graph.add_edge(START, "bump");
//! graph.add_edge("bump", END);
//!
//! let compiled = graph.compile()?;
//! let out = compiled.invoke(State { count: 0 }).await?;
//! assert_eq!(out.count, 1);
//! ```
//!
//! ## Checkpointing
//!
//! Attach a [`flowgraph_checkpoint::CheckpointSaver`] with
//! [`CompiledGraph::with_checkpointer`] and pass a
//! [`CheckpointConfig`](flowgraph_checkpoint::CheckpointConfig) to
//! `invoke_with_config`: the final state of each run is snapshotted under the
//! config's `thread_id`, and `get_state`/`update_state` read and rewrite the
//! latest snapshot. State types only need `Serialize + DeserializeOwned`.
//!
//! ## Modules
//!
//! - [`graph`] - low-level graph representation and validation
//! - [`builder`] - [`StateGraph`] construction API
//! - [`compiled`] - [`CompiledGraph`] runtime
//! - [`messages`] - chat message types shared by graph-based agents
//! - [`visualization`] - DOT/Mermaid/ASCII rendering of graph structure
//! - [`error`] - [`GraphError`]

pub mod builder;
pub mod compiled;
pub mod error;
pub mod graph;
pub mod messages;
pub mod visualization;

pub use builder::StateGraph;
pub use compiled::CompiledGraph;
pub use error::{GraphError, Result};
pub use graph::{Edge, EdgeRouter, Graph, NodeExecutor, NodeId, NodeSpec, END, START};
pub use messages::{Message, MessageRole, ToolCall};
pub use visualization::{visualize, VisualizationFormat, VisualizationOptions};
