//! Similarity retrieval over a video's vector index.

use super::Retriever;
use crate::chunking::TranscriptChunk;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::VectorIndex;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Embeds the query and returns the top-k chunks of one index.
pub struct VectorRetriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl VectorRetriever {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            index,
            embedder,
            top_k: 4,
        }
    }

    /// Set the number of chunks returned per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn index_len(&self) -> usize {
        self.index.len()
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    #[instrument(skip(self, query))]
    async fn retrieve(&self, query: &str) -> Result<Vec<TranscriptChunk>> {
        let query_embedding = self.embedder.embed(query).await?;
        let results = self.index.search(&query_embedding, self.top_k)?;

        debug!(
            "Retrieved {} of {} chunks (best score {:.3})",
            results.len(),
            self.index.len(),
            results.first().map(|r| r.score).unwrap_or(0.0)
        );

        Ok(results.into_iter().map(|r| r.chunk).collect())
    }
}
