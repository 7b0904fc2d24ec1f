//! vidqa - Question answering over YouTube transcripts
//!
//! Fetches a video's English and Hindi captions, splits them into overlapping
//! passages, embeds them into a per-video vector index and answers questions
//! with an LLM grounded on the most relevant passages.
//!
//! # Overview
//!
//! Each video is processed once; the resulting retriever and answer generator
//! are kept in an in-memory [`cache::ProcessingCache`] for the lifetime of the
//! process. Asking about an unprocessed video processes it first.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management and prompt templates
//! - `transcript` - Caption track discovery, download and merging
//! - `chunking` - Recursive character chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - In-memory vector index
//! - `rag` - Retrieval and answer generation
//! - `cache` - Per-video processing cache
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use vidqa::config::Settings;
//! use vidqa::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let answer = orchestrator
//!         .get_answer("dQw4w9WgXcQ", "What is this video about?")
//!         .await?;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod transcript;
pub mod vector_store;

pub use error::{ProcessingError, RequestError, Result, VidqaError};
