//! Embedding generation for semantic search and retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// A vector embedding.
pub type Embedding = Vec<f32>;

/// Trait for embedding generation.
///
/// Implementations are created once and shared across videos, so they must be
/// safe to call concurrently.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}
