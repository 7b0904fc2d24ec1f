//! Error types for vidqa.

use thiserror::Error;

/// Library-level error type for vidqa operations.
#[derive(Error, Debug)]
pub enum VidqaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("No transcript found: {0}")]
    NoTranscriptFound(String),

    #[error("Transcript service error: {0}")]
    TranscriptService(String),

    #[error("Chunking failed: {0}")]
    Chunking(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),
}

/// Result type alias for vidqa operations.
pub type Result<T> = std::result::Result<T, VidqaError>;

/// Why a video has no usable transcript.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    #[error("Transcripts are disabled for this video.")]
    Disabled,

    #[error("No English or Hindi transcript found for this video.")]
    NotFound,
}

/// Failure of `Orchestrator::ensure_processed`.
///
/// A failed attempt never leaves anything in the processing cache, so every
/// variant can be followed by another attempt; only [`FetchFault`] is expected
/// to succeed without an external change.
///
/// [`FetchFault`]: ProcessingError::FetchFault
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    #[error("video_id must not be empty")]
    EmptyVideoId,

    #[error("{0}")]
    TranscriptUnavailable(Unavailable),

    #[error("Error fetching transcript: {0}")]
    FetchFault(String),

    /// The transcript tool is not installed.
    #[error("Error fetching transcript: {0}")]
    ToolMissing(String),

    #[error("Error creating vector store or chain: {0}")]
    PipelineFault(String),
}

impl ProcessingError {
    /// Whether re-invoking processing may succeed without any external change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProcessingError::FetchFault(_))
    }
}

/// Failure of `Orchestrator::get_answer`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("Failed to generate answer: {0}")]
    GenerationFault(String),
}
