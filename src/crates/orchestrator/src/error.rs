//! Orchestrator error types.

use thiserror::Error;

/// Convenience result type using [`OrchestratorError`].
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Errors surfaced by the orchestration layer.
///
/// Recovered conditions (condition-eval failures, retrieval failures, tool
/// failures) never appear here; they degrade in place and are logged. These
/// variants are the ones callers can observe.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// The requested flow is not loaded and cannot be found on disk.
    #[error("Flow not found: {0}")]
    FlowNotFound(String),

    /// A token or session context required for the request does not exist.
    #[error("Context not found: {0}")]
    ContextNotFound(String),

    /// A flow definition failed to parse or violated structural invariants.
    #[error("Flow '{flow}' failed to parse: {error}")]
    FlowParse {
        /// Flow name (or path when the name is unknown).
        flow: String,
        /// What went wrong.
        error: String,
    },

    /// A flow definition could not be compiled into a graph.
    #[error("Flow '{flow}' failed to compile: {error}")]
    FlowCompile {
        /// Flow name.
        flow: String,
        /// What went wrong.
        error: String,
    },

    /// A prompt template could not be loaded or was missing from the cache.
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Model construction or invocation failed at a level the turn could not
    /// absorb.
    #[error("LLM error: {0}")]
    Llm(#[from] llm::LlmError),

    /// Graph execution failed.
    #[error("Graph error: {0}")]
    Graph(#[from] flowgraph::GraphError),

    /// Filesystem failure while reading flow or prompt files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Repository failure surfaced outside a tool (tools absorb their own).
    #[error("Storage error: {0}")]
    Store(String),

    /// Invalid runtime configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}
