//! In-memory vector index implementation.
//!
//! Brute-force cosine search; transcripts of a single video produce at most a
//! few hundred chunks.

use super::{cosine_similarity, SearchResult, VectorIndex};
use crate::chunking::TranscriptChunk;
use crate::embedding::Embedding;
use crate::error::{Result, VidqaError};

#[derive(Debug, Clone)]
struct IndexedChunk {
    chunk: TranscriptChunk,
    embedding: Embedding,
}

/// Immutable in-memory vector index.
#[derive(Debug, Clone)]
pub struct MemoryVectorIndex {
    entries: Vec<IndexedChunk>,
    dimensions: usize,
}

impl MemoryVectorIndex {
    /// Build an index from chunks and their embeddings (same order, same length).
    pub fn build(chunks: Vec<TranscriptChunk>, embeddings: Vec<Embedding>) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(VidqaError::VectorIndex(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let dimensions = embeddings.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = embeddings.iter().position(|e| e.len() != dimensions) {
            return Err(VidqaError::VectorIndex(format!(
                "embedding {} has {} dimensions, expected {}",
                bad,
                embeddings[bad].len(),
                dimensions
            )));
        }
        if dimensions == 0 && !embeddings.is_empty() {
            return Err(VidqaError::VectorIndex("embeddings are empty".to_string()));
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
            .collect();

        Ok(Self {
            entries,
            dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

impl VectorIndex for MemoryVectorIndex {
    fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if query_embedding.len() != self.dimensions {
            return Err(VidqaError::VectorIndex(format!(
                "query has {} dimensions, index has {}",
                query_embedding.len(),
                self.dimensions
            )));
        }

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        // Ties go to the earlier chunk.
        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk.order.cmp(&b.chunk.order))
        });
        results.truncate(k);

        Ok(results)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
