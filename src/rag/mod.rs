//! RAG (Retrieval-Augmented Generation) for question answering over a video transcript.
//!
//! A [`Retriever`] is bound to one video's index; a [`Generator`] composes a
//! retriever with a [`LanguageModel`] and the answer prompt.

mod generator;
mod llm;
mod retriever;

pub use generator::AnswerGenerator;
pub use llm::{LanguageModel, OpenAIChatModel};
pub use retriever::VectorRetriever;

use crate::chunking::TranscriptChunk;
use crate::error::Result;
use async_trait::async_trait;

/// Returns the chunks most relevant to a query, best first.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<TranscriptChunk>>;
}

/// Answers a question about the video it is bound to.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String>;
}

/// Join chunk texts into the context block of the answer prompt.
pub fn format_context(chunks: &[TranscriptChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_context_joins_with_blank_lines() {
        let chunks = vec![
            TranscriptChunk::new("first".to_string(), 0),
            TranscriptChunk::new("second".to_string(), 1),
        ];
        assert_eq!(format_context(&chunks), "first\n\nsecond");
        assert_eq!(format_context(&[]), "");
    }
}
