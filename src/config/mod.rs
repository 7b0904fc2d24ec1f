//! Configuration module for vidqa.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, GenerationSettings, PromptSettings,
    RetrievalSettings, ServerSettings, Settings, TranscriptSettings,
};
