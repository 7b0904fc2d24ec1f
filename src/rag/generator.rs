//! Answer generation.

use super::{format_context, LanguageModel, Retriever};
use crate::config::Prompts;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Retrieves context for a question and asks the language model to answer it.
pub struct AnswerGenerator {
    retriever: Arc<dyn Retriever>,
    model: Arc<dyn LanguageModel>,
    prompts: Arc<Prompts>,
}

impl AnswerGenerator {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        model: Arc<dyn LanguageModel>,
        prompts: Arc<Prompts>,
    ) -> Self {
        Self {
            retriever,
            model,
            prompts,
        }
    }
}

#[async_trait]
impl super::Generator for AnswerGenerator {
    #[instrument(skip(self), fields(question = %question))]
    async fn answer(&self, question: &str) -> Result<String> {
        info!("Processing question: {}", question);

        let chunks = self.retriever.retrieve(question).await?;
        let context = format_context(&chunks);
        let prompt = self.prompts.render_answer(&context, question);

        debug!("Prompt built from {} chunks ({} chars)", chunks.len(), prompt.len());

        let output = self.model.complete(&prompt).await?;
        if output.trim().is_empty() {
            warn!("Model returned an empty answer");
        }

        Ok(output.trim().to_string())
    }
}
