//! Vector index abstraction for vidqa.
//!
//! An index is built once per video from chunk embeddings and is read-only
//! afterwards, so it can be shared between concurrent questions without
//! locking.

mod memory;

pub use memory::MemoryVectorIndex;

use crate::chunking::TranscriptChunk;
use crate::error::Result;

/// A search result with score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The matched chunk.
    pub chunk: TranscriptChunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector index implementations.
pub trait VectorIndex: Send + Sync {
    /// Top-`k` chunks by descending similarity to `query_embedding`.
    ///
    /// Returns fewer than `k` results when the index holds fewer chunks.
    /// Results must be deterministic for identical inputs.
    fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Number of indexed chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
