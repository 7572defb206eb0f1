//! RAG retrieval: embeddings, multi-table vector search, formatting.
//!
//! Retrieval is strictly best-effort. Every failure in this module degrades
//! to the no-examples fallback at the retrieval node; nothing here may abort
//! a turn.

pub mod embedding;
pub mod formatter;
pub mod search;

pub use embedding::{Embedder, HttpEmbedder};
pub use formatter::{format_retrieved_examples, NO_EXAMPLES};
pub use search::{
    ExampleRow, MemoryVectorIndex, RetrievedExample, Retriever, VectorIndex, DEFAULT_TABLES,
};

use thiserror::Error;

/// Errors inside the retrieval pipeline.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Embedding generation failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The vector backend failed.
    #[error("vector search failed: {0}")]
    Backend(String),

    /// Transport failure talking to the embeddings endpoint.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
