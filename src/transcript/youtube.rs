//! YouTube captions via yt-dlp.
//!
//! Track discovery runs `yt-dlp --dump-json`; the selected track is then
//! downloaded directly in YouTube's `json3` caption format.

use super::{TranscriptService, TranscriptSnippet, TranscriptTrack};
use crate::config::TranscriptSettings;
use crate::error::{Result, VidqaError};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Caption source backed by yt-dlp and direct caption downloads.
pub struct YtDlpTranscriptService {
    ytdlp_path: String,
    list_timeout: Duration,
    http: reqwest::Client,
}

impl YtDlpTranscriptService {
    pub fn new() -> Result<Self> {
        Self::with_config(&TranscriptSettings::default())
    }

    pub fn with_config(settings: &TranscriptSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.fetch_timeout_secs))
            .build()
            .map_err(|e| VidqaError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            ytdlp_path: settings.ytdlp_path.clone(),
            list_timeout: Duration::from_secs(settings.list_timeout_secs),
            http,
        })
    }

    /// Fetch video metadata (including caption maps) using yt-dlp.
    async fn dump_video_info(&self, video_id: &str) -> Result<VideoInfo> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);

        let command = Command::new(&self.ytdlp_path)
            .args([
                "--dump-json",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                &url,
            ])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.list_timeout, command)
            .await
            .map_err(|_| {
                VidqaError::TranscriptService(format!(
                    "yt-dlp timed out after {}s",
                    self.list_timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VidqaError::ToolNotFound(self.ytdlp_path.clone())
                } else {
                    VidqaError::TranscriptService(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidqaError::TranscriptService(format!(
                "Video {} not found or unavailable: {}",
                video_id,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            VidqaError::TranscriptService(format!("Failed to parse yt-dlp output: {}", e))
        })
    }
}

#[async_trait]
impl TranscriptService for YtDlpTranscriptService {
    #[instrument(skip(self))]
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<TranscriptTrack>> {
        let info = self.dump_video_info(video_id).await?;
        let tracks = tracks_from_info(video_id, info);

        if tracks.is_empty() {
            return Err(VidqaError::TranscriptsDisabled(video_id.to_string()));
        }

        info!("Found {} caption tracks for {}", tracks.len(), video_id);
        Ok(tracks)
    }

    #[instrument(skip(self, track), fields(video_id = %track.video_id, language = %track.language_code))]
    async fn fetch_track(&self, track: &TranscriptTrack) -> Result<Vec<TranscriptSnippet>> {
        let response = self.http.get(&track.url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(VidqaError::NoTranscriptFound(format!(
                "{} track for {}",
                track.language_code, track.video_id
            )));
        }

        let captions: Json3Captions = response.error_for_status()?.json().await?;
        let snippets = captions.into_snippets();
        debug!("Downloaded {} snippets", snippets.len());
        Ok(snippets)
    }
}

/// The part of yt-dlp's `--dump-json` output we care about.
#[derive(Debug, Default, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    subtitles: BTreeMap<String, Vec<CaptionFormat>>,
    #[serde(default)]
    automatic_captions: BTreeMap<String, Vec<CaptionFormat>>,
}

#[derive(Debug, Deserialize)]
struct CaptionFormat {
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Turn yt-dlp's caption maps into tracks, manual tracks first.
///
/// Machine translations (URLs carrying `tlang`) and live chat replays are
/// skipped.
fn tracks_from_info(video_id: &str, info: VideoInfo) -> Vec<TranscriptTrack> {
    let manual = info.subtitles.into_iter().map(|entry| (entry, false));
    let generated = info.automatic_captions.into_iter().map(|entry| (entry, true));

    manual
        .chain(generated)
        .filter(|((code, _), _)| code != "live_chat")
        .filter_map(|((code, formats), is_generated)| {
            let (url, name) = pick_json3_url(&formats)?;
            Some(TranscriptTrack {
                video_id: video_id.to_string(),
                name: name.unwrap_or_else(|| code.clone()),
                language_code: code,
                is_generated,
                url,
            })
        })
        .collect()
}

/// Pick a json3 download URL from a track's formats.
fn pick_json3_url(formats: &[CaptionFormat]) -> Option<(String, Option<String>)> {
    let format = formats
        .iter()
        .find(|f| f.ext.as_deref() == Some("json3") && f.url.is_some())
        .or_else(|| formats.iter().find(|f| f.url.is_some()))?;

    let mut url = url::Url::parse(format.url.as_deref()?).ok()?;
    if url.query_pairs().any(|(key, _)| key == "tlang") {
        return None;
    }

    if format.ext.as_deref() != Some("json3") {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "fmt")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("fmt", "json3");
    }

    Some((url.to_string(), format.name.clone()))
}

/// YouTube `json3` caption document.
#[derive(Debug, Deserialize)]
struct Json3Captions {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

impl Json3Captions {
    fn into_snippets(self) -> Vec<TranscriptSnippet> {
        self.events
            .into_iter()
            .filter_map(|event| {
                let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
                let text = text.replace('\n', " ");
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                Some(TranscriptSnippet::new(
                    text,
                    event.start_ms as f64 / 1000.0,
                    event.duration_ms as f64 / 1000.0,
                ))
            })
            .collect()
    }
}

fn video_id_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/|youtube\.com/v/)
                ([a-zA-Z0-9_-]{11})
            )
        ",
        )
        .expect("video id regex is valid")
    })
}

/// Reduce a YouTube URL to its video id. Anything else is returned trimmed.
pub fn extract_video_id(input: &str) -> String {
    let input = input.trim();
    video_id_regex()
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| input.to_string())
}
