//! # orchestrator - configuration-driven conversational agent flows
//!
//! The orchestrator turns YAML flow definitions into executable state graphs
//! and runs one graph invocation per chat turn. A flow's nodes are either
//! LLM-backed agents (ReAct loops with scoped tool access) or RAG retrieval
//! steps; its edges carry guarded transition expressions evaluated against
//! per-turn routing variables.
//!
//! ## Subsystems
//!
//! - [`flows`] - definition model, YAML parser, condition evaluator, graph
//!   builder, and the compiled-flow cache
//! - [`state`] - the per-turn [`FlowState`](state::FlowState) record
//! - [`agents`] - agent factory and the ReAct executor
//! - [`prompts`] - two-stage prompt templating (load-time rule fragments,
//!   turn-time variables)
//! - [`context`] - process-wide token/session stores and the ambient
//!   per-turn identity carrier
//! - [`tools`] - the tool registry and the domain record tools
//! - [`repository`] - record stores the tools persist through
//! - [`rag`] - embeddings, vector search with threshold fallback, formatting
//! - [`service`] - the chat turn entry point and session/token lifecycle
//! - [`api`] - thin HTTP surface over the services
//!
//! Everything is wired together once into an [`AppContext`](app::AppContext)
//! and shared behind `Arc`s.

pub mod agents;
pub mod api;
pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod flows;
pub mod prompts;
pub mod rag;
pub mod repository;
pub mod service;
pub mod state;
pub mod tools;

pub use app::AppContext;
pub use config::Settings;
pub use error::{OrchestratorError, Result};
pub use state::FlowState;
