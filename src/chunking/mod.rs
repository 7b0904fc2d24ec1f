//! Transcript chunking for retrieval.
//!
//! Transcripts are split into overlapping passages that fit a character
//! budget, preferring paragraph, line, sentence and word boundaries before
//! falling back to a hard character split.

mod recursive;

pub use recursive::{RecursiveChunker, DEFAULT_SEPARATORS};

use crate::config::ChunkingSettings;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A passage of transcript text used as a retrieval unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    /// Text content of this chunk.
    pub content: String,
    /// Position of this chunk in the transcript.
    pub order: usize,
}

impl TranscriptChunk {
    pub fn new(content: String, order: usize) -> Self {
        Self { content, order }
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Configuration for chunking. Sizes are in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk length.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }
}

/// Trait for text chunking implementations.
pub trait Chunker: Send + Sync {
    /// Split text into ordered chunks. Must be a pure function of the input.
    fn chunk(&self, text: &str) -> Vec<TranscriptChunk>;
}

/// Create the default chunker for the given settings.
pub fn create_chunker(settings: &ChunkingSettings) -> Result<RecursiveChunker> {
    RecursiveChunker::new(ChunkingConfig::from(settings))
}
