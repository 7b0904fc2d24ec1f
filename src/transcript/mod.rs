//! Transcript acquisition for YouTube videos.
//!
//! A [`TranscriptService`] lists the caption tracks of a video and downloads
//! them; the [`TranscriptFetcher`] picks the English and Hindi tracks, joins
//! their snippets into plain text and folds every failure into a
//! [`TranscriptResult`].

mod youtube;

pub use youtube::{extract_video_id, YtDlpTranscriptService};

use crate::error::{Result, VidqaError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A caption language the fetcher looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackLanguage {
    /// Language code as used by YouTube (e.g. "en").
    pub code: &'static str,
    /// Human-readable name used in section headers.
    pub label: &'static str,
}

pub const ENGLISH: TrackLanguage = TrackLanguage {
    code: "en",
    label: "English",
};

pub const HINDI: TrackLanguage = TrackLanguage {
    code: "hi",
    label: "Hindi",
};

impl TrackLanguage {
    /// Header placed above this language's text in a merged transcript.
    pub fn header(&self) -> String {
        format!("[{} Transcript]", self.label)
    }
}

/// A caption track available for a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTrack {
    /// Video the track belongs to.
    pub video_id: String,
    /// Language code (e.g. "en", "en-US", "hi").
    pub language_code: String,
    /// Display name reported by the provider.
    pub name: String,
    /// Whether the track was generated by speech recognition.
    pub is_generated: bool,
    /// Where the track can be downloaded from.
    pub url: String,
}

impl TranscriptTrack {
    /// Primary language subtag ("en" for "en-US").
    pub fn primary_language(&self) -> &str {
        self.language_code
            .split(['-', '_'])
            .next()
            .unwrap_or(&self.language_code)
    }
}

/// A timed transcript fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSnippet {
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl TranscriptSnippet {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}

/// Outcome of fetching a video's transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptResult {
    /// Normalized transcript text.
    Available(String),
    /// The uploader disabled transcripts for this video.
    Disabled,
    /// Neither an English nor a Hindi track exists.
    NotFound,
    /// The caption tool itself is not installed.
    ToolMissing(String),
    /// Anything else went wrong while talking to the provider.
    FetchError(String),
}

/// Trait for caption providers.
///
/// Implementations report [`VidqaError::TranscriptsDisabled`] when a video has
/// no captions at all and [`VidqaError::NoTranscriptFound`] when a requested
/// track cannot be found.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptService: Send + Sync {
    /// List the caption tracks available for a video.
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<TranscriptTrack>>;

    /// Download a track as ordered snippets.
    async fn fetch_track(&self, track: &TranscriptTrack) -> Result<Vec<TranscriptSnippet>>;
}

/// Choose the best track for a language.
///
/// Exact language-code matches beat primary-subtag matches ("en-US" for
/// "en"), and manually created tracks beat generated ones.
pub fn find_track<'a>(tracks: &'a [TranscriptTrack], language: &str) -> Option<&'a TranscriptTrack> {
    let exact = |generated: bool| {
        tracks
            .iter()
            .find(|t| t.language_code == language && t.is_generated == generated)
    };
    let regional = |generated: bool| {
        tracks
            .iter()
            .find(|t| t.primary_language() == language && t.is_generated == generated)
    };

    exact(false)
        .or_else(|| exact(true))
        .or_else(|| regional(false))
        .or_else(|| regional(true))
}

/// Join snippet texts with single spaces, dropping timing.
pub fn join_snippets(snippets: &[TranscriptSnippet]) -> String {
    snippets
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Combine the per-language texts into a single transcript.
pub fn merge_transcripts(english: Option<String>, hindi: Option<String>) -> TranscriptResult {
    match (english, hindi) {
        (Some(en), Some(hi)) => TranscriptResult::Available(format!(
            "{}\n{}\n\n{}\n{}",
            ENGLISH.header(),
            en,
            HINDI.header(),
            hi
        )),
        (Some(en), None) => TranscriptResult::Available(en),
        (None, Some(hi)) => TranscriptResult::Available(format!("{}\n{}", HINDI.header(), hi)),
        (None, None) => TranscriptResult::NotFound,
    }
}

/// Fetches and normalizes transcripts through a [`TranscriptService`].
#[derive(Clone)]
pub struct TranscriptFetcher {
    service: Arc<dyn TranscriptService>,
}

impl TranscriptFetcher {
    pub fn new(service: Arc<dyn TranscriptService>) -> Self {
        Self { service }
    }

    /// Fetch the English and Hindi transcripts of a video and merge them.
    ///
    /// Never fails: every provider error is mapped onto a [`TranscriptResult`].
    #[instrument(skip(self))]
    pub async fn fetch(&self, video_id: &str) -> TranscriptResult {
        let tracks = match self.service.list_tracks(video_id).await {
            Ok(tracks) => tracks,
            Err(VidqaError::TranscriptsDisabled(_)) => return TranscriptResult::Disabled,
            Err(VidqaError::NoTranscriptFound(_)) => return TranscriptResult::NotFound,
            Err(e @ VidqaError::ToolNotFound(_)) => {
                warn!("Cannot list transcripts for {}: {}", video_id, e);
                return TranscriptResult::ToolMissing(e.to_string());
            }
            Err(e) => {
                warn!("Listing transcripts failed for {}: {}", video_id, e);
                return TranscriptResult::FetchError(e.to_string());
            }
        };

        debug!("{} caption tracks available for {}", tracks.len(), video_id);

        let (english, hindi) = futures::future::join(
            self.fetch_language(&tracks, ENGLISH),
            self.fetch_language(&tracks, HINDI),
        )
        .await;

        let english = match english {
            Ok(text) => text,
            Err(e) => return TranscriptResult::FetchError(e.to_string()),
        };
        let hindi = match hindi {
            Ok(text) => text,
            Err(e) => return TranscriptResult::FetchError(e.to_string()),
        };

        info!(
            english = english.is_some(),
            hindi = hindi.is_some(),
            "Fetched transcripts for {}",
            video_id
        );

        merge_transcripts(english, hindi)
    }

    /// Fetch one language. A missing or empty track is `Ok(None)`.
    async fn fetch_language(
        &self,
        tracks: &[TranscriptTrack],
        language: TrackLanguage,
    ) -> Result<Option<String>> {
        let Some(track) = find_track(tracks, language.code) else {
            debug!("No {} track", language.label);
            return Ok(None);
        };

        match self.service.fetch_track(track).await {
            Ok(snippets) => {
                let text = join_snippets(&snippets);
                Ok((!text.trim().is_empty()).then_some(text))
            }
            Err(VidqaError::NoTranscriptFound(_)) => Ok(None),
            Err(e) => {
                warn!("Fetching {} track failed: {}", language.label, e);
                Err(e)
            }
        }
    }
}
