//! Multi-table cosine-similarity search with threshold fallback.

use crate::rag::embedding::{l2_normalize, Embedder};
use crate::rag::RetrievalError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Example tables searched when a retrieval node does not name its own.
pub const DEFAULT_TABLES: [&str; 4] = [
    "qa_examples",
    "record_examples",
    "query_examples",
    "greeting_examples",
];

/// Per-table result cap.
const TOP_K_PER_TABLE: usize = 5;

/// Thresholds tried in order until enough results accumulate.
const FALLBACK_THRESHOLDS: [f32; 3] = [0.7, 0.6, 0.5];

/// One retrieved exemplar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedExample {
    /// The example's user side.
    pub user_input: String,

    /// The example's agent side.
    pub agent_response: String,

    /// Topical tags.
    pub tags: Vec<String>,

    /// Optional curation grade.
    pub quality_grade: Option<String>,

    /// Cosine similarity to the query, in `[0, 1]`.
    pub similarity: f32,

    /// Table the example came from.
    pub source_table: String,
}

/// A stored example row with its embedding.
#[derive(Debug, Clone)]
pub struct ExampleRow {
    pub user_input: String,
    pub agent_response: String,
    pub tags: Vec<String>,
    pub quality_grade: Option<String>,
    pub embedding: Vec<f32>,
}

/// Vector search backend over named tables.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Top-`top_k` rows of `table` with cosine similarity ≥ `threshold`,
    /// descending by similarity.
    async fn search(
        &self,
        table: &str,
        query: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<RetrievedExample>, RetrievalError>;
}

/// In-memory [`VectorIndex`]. Rows are normalized on insert, so similarity is
/// a dot product.
#[derive(Default)]
pub struct MemoryVectorIndex {
    tables: RwLock<HashMap<String, Vec<ExampleRow>>>,
}

impl MemoryVectorIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row into a table.
    pub fn insert(&self, table: impl Into<String>, mut row: ExampleRow) {
        row.embedding = l2_normalize(row.embedding);
        self.tables.write().entry(table.into()).or_default().push(row);
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn search(
        &self,
        table: &str,
        query: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<RetrievedExample>, RetrievalError> {
        let tables = self.tables.read();
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<RetrievedExample> = rows
            .iter()
            .filter_map(|row| {
                if row.embedding.len() != query.len() {
                    return None;
                }
                let similarity = dot(&row.embedding, query);
                if similarity < threshold {
                    return None;
                }
                Some(RetrievedExample {
                    user_input: row.user_input.clone(),
                    agent_response: row.agent_response.clone(),
                    tags: row.tags.clone(),
                    quality_grade: row.quality_grade.clone(),
                    similarity,
                    source_table: table.to_string(),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(top_k);
        Ok(hits)
    }
}

/// Retrieval front-end: embeds the query, searches every table, merges.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    /// Create a retriever over the given embedder and index.
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Search for exemplars grounding a reply to `query_text`.
    ///
    /// Keywords, when present, are appended to the query before embedding.
    /// Thresholds 0.7, 0.6, 0.5 are tried in order; the first pass whose
    /// merged result count reaches `min_results` wins. If even the loosest
    /// threshold underfills, whatever it found is returned. Results are
    /// merged across tables, sorted by descending similarity, and truncated
    /// to `top_k`.
    pub async fn search(
        &self,
        query_text: &str,
        keywords: &[String],
        tables: Option<&[String]>,
        top_k: usize,
        min_results: usize,
    ) -> Result<Vec<RetrievedExample>, RetrievalError> {
        if query_text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let enhanced = if keywords.is_empty() {
            query_text.to_string()
        } else {
            format!("{} {}", query_text, keywords.join(" "))
        };

        let query = self.embedder.embed(&enhanced).await?;

        let default_tables: Vec<String> =
            DEFAULT_TABLES.iter().map(|s| s.to_string()).collect();
        let tables = tables.unwrap_or(default_tables.as_slice());

        let mut merged = Vec::new();
        for threshold in FALLBACK_THRESHOLDS {
            merged.clear();
            for table in tables {
                let hits = self
                    .index
                    .search(table, &query, TOP_K_PER_TABLE, threshold)
                    .await?;
                merged.extend(hits);
            }
            merged.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

            if merged.len() >= min_results {
                tracing::debug!(threshold, count = merged.len(), "Retrieval threshold satisfied");
                break;
            }
        }

        if merged.len() < min_results {
            tracing::warn!(
                found = merged.len(),
                wanted = min_results,
                "Retrieval underfilled even at the loosest threshold"
            );
        }

        merged.truncate(top_k);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test embedder: maps known phrases to fixed unit vectors.
    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
            // Axis-aligned for exact similarity control in tests.
            Ok(match text {
                t if t.contains("pressure") => vec![1.0, 0.0, 0.0],
                t if t.contains("greet") => vec![0.0, 1.0, 0.0],
                _ => vec![0.0, 0.0, 1.0],
            })
        }
    }

    fn row(user_input: &str, embedding: Vec<f32>) -> ExampleRow {
        ExampleRow {
            user_input: user_input.to_string(),
            agent_response: format!("reply to {user_input}"),
            tags: vec!["tag".to_string()],
            quality_grade: Some("a".to_string()),
            embedding,
        }
    }

    fn angled(main_axis: usize, similarity: f32) -> Vec<f32> {
        // Unit vector whose dot with the axis is exactly `similarity`.
        let other = (1.0 - similarity * similarity).sqrt();
        let mut v = vec![0.0, 0.0, 0.0];
        v[main_axis] = similarity;
        v[(main_axis + 1) % 3] = other;
        v
    }

    fn retriever(index: MemoryVectorIndex) -> Retriever {
        Retriever::new(Arc::new(StubEmbedder), Arc::new(index))
    }

    #[tokio::test]
    async fn results_are_sorted_and_bounded() {
        let index = MemoryVectorIndex::new();
        for i in 0..10 {
            let similarity = 0.95 - 0.02 * i as f32;
            index.insert("qa_examples", row(&format!("q{i}"), angled(0, similarity)));
        }

        let retriever = retriever(index);
        let results = retriever
            .search("blood pressure", &[], None, 4, 1)
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        for pair in results.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        for r in &results {
            assert!(r.similarity >= 0.0 && r.similarity <= 1.0);
        }
    }

    #[tokio::test]
    async fn threshold_fallback_descends_until_filled() {
        let index = MemoryVectorIndex::new();
        // 0 rows above 0.7, 2 above 0.6, 5 above 0.5.
        index.insert("qa_examples", row("a", angled(0, 0.65)));
        index.insert("qa_examples", row("b", angled(0, 0.62)));
        index.insert("qa_examples", row("c", angled(0, 0.55)));
        index.insert("qa_examples", row("d", angled(0, 0.54)));
        index.insert("qa_examples", row("e", angled(0, 0.52)));

        let retriever = retriever(index);
        let results = retriever
            .search("blood pressure", &[], None, 15, 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 5);
    }

    #[tokio::test]
    async fn underfilled_search_returns_what_it_found() {
        let index = MemoryVectorIndex::new();
        index.insert("qa_examples", row("only", angled(0, 0.9)));

        let retriever = retriever(index);
        let results = retriever
            .search("blood pressure", &[], None, 15, 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn merges_across_tables() {
        let index = MemoryVectorIndex::new();
        index.insert("qa_examples", row("in qa", angled(0, 0.9)));
        index.insert("record_examples", row("in record", angled(0, 0.95)));

        let retriever = retriever(index);
        let results = retriever
            .search("blood pressure", &[], None, 15, 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source_table, "record_examples");
    }

    #[tokio::test]
    async fn explicit_table_list_restricts_search() {
        let index = MemoryVectorIndex::new();
        index.insert("qa_examples", row("in qa", angled(0, 0.9)));
        index.insert("record_examples", row("in record", angled(0, 0.95)));

        let retriever = retriever(index);
        let tables = vec!["qa_examples".to_string()];
        let results = retriever
            .search("blood pressure", &[], Some(&tables), 15, 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_table, "qa_examples");
    }

    #[tokio::test]
    async fn empty_query_returns_nothing() {
        let retriever = retriever(MemoryVectorIndex::new());
        let results = retriever.search("   ", &[], None, 15, 5).await.unwrap();
        assert!(results.is_empty());
    }
}
