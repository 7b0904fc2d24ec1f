//! Per-video processing cache.
//!
//! Holds the retrieval and generation pipeline built for each processed video.
//! Entries are published whole and never modified afterwards; a failed build
//! publishes nothing.

use crate::rag::{Generator, Retriever};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The ready-to-query pipeline of one video.
pub struct ProcessingEntry {
    pub retriever: Arc<dyn Retriever>,
    pub generator: Arc<dyn Generator>,
    /// Number of chunks in the video's index.
    pub chunk_count: usize,
    pub processed_at: DateTime<Utc>,
}

impl ProcessingEntry {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        chunk_count: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            chunk_count,
            processed_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for ProcessingEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingEntry")
            .field("chunk_count", &self.chunk_count)
            .field("processed_at", &self.processed_at)
            .finish_non_exhaustive()
    }
}

/// Summary of a cached video, for listing.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CachedVideo {
    pub video_id: String,
    pub chunk_count: usize,
    pub processed_at: DateTime<Utc>,
}

/// Map from video id to its processing entry.
#[derive(Debug, Default)]
pub struct ProcessingCache {
    entries: RwLock<HashMap<String, Arc<ProcessingEntry>>>,
}

impl ProcessingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, video_id: &str) -> Option<Arc<ProcessingEntry>> {
        self.entries.read().await.get(video_id).cloned()
    }

    pub async fn contains(&self, video_id: &str) -> bool {
        self.entries.read().await.contains_key(video_id)
    }

    /// Publish an entry, replacing any previous one. Returns the number of cached videos.
    pub async fn insert(&self, video_id: impl Into<String>, entry: Arc<ProcessingEntry>) -> usize {
        let mut entries = self.entries.write().await;
        entries.insert(video_id.into(), entry);
        entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Cached videos, most recently processed first.
    pub async fn list(&self) -> Vec<CachedVideo> {
        let entries = self.entries.read().await;
        let mut videos: Vec<CachedVideo> = entries
            .iter()
            .map(|(id, entry)| CachedVideo {
                video_id: id.clone(),
                chunk_count: entry.chunk_count,
                processed_at: entry.processed_at,
            })
            .collect();
        videos.sort_by(|a, b| {
            b.processed_at
                .cmp(&a.processed_at)
                .then_with(|| a.video_id.cmp(&b.video_id))
        });
        videos
    }
}
