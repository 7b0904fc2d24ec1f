//! HTTP API server for the browser extension.
//!
//! Every endpoint is a GET with query parameters. Pipeline failures are
//! reported in the JSON body with status 200; the extension treats any other
//! status as the server being down.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, mut settings: Settings) -> anyhow::Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }

    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'vidqa doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let addr = settings.bind_address();
    let orchestrator = Orchestrator::new(settings)?;
    let app = router(Arc::new(AppState { orchestrator }));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    Output::header("vidqa API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET /health");
    Output::kv("Process", "GET /process_video?video_id=ID");
    Output::kv("Ask", "GET /ask?video_id=ID&question=Q");
    Output::kv("Cached videos", "GET /videos");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/process_video", get(process_video))
        .route("/ask", get(ask))
        .route("/videos", get(list_videos))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ProcessQuery {
    video_id: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "lowercase")]
enum ProcessStatus {
    Success,
    Failed,
}

#[derive(Serialize, Debug)]
struct ProcessResponse {
    status: ProcessStatus,
    message: String,
}

#[derive(Deserialize, Debug)]
struct AskQuery {
    video_id: String,
    question: String,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum AskResponse {
    Answer { answer: String },
    Error { error: String },
}

#[derive(Serialize)]
struct VideoListResponse {
    videos: Vec<crate::cache::CachedVideo>,
    total: usize,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn process_video(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProcessQuery>,
) -> impl IntoResponse {
    let response = match state.orchestrator.ensure_processed(&query.video_id).await {
        Ok(_) => ProcessResponse {
            status: ProcessStatus::Success,
            message: format!(
                "Transcript processed successfully for video: {}",
                query.video_id
            ),
        },
        Err(e) => ProcessResponse {
            status: ProcessStatus::Failed,
            message: e.to_string(),
        },
    };

    Json(response)
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AskQuery>,
) -> impl IntoResponse {
    let response = match state
        .orchestrator
        .get_answer(&query.video_id, &query.question)
        .await
    {
        Ok(answer) => AskResponse::Answer { answer },
        Err(e) => AskResponse::Error {
            error: e.to_string(),
        },
    };

    Json(response)
}

async fn list_videos(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let videos = state.orchestrator.cached_videos().await;
    Json(VideoListResponse {
        total: videos.len(),
        videos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ProcessingCache;
    use crate::config::Prompts;
    use crate::embedding::{Embedder, Embedding};
    use crate::error::{Result, VidqaError};
    use crate::rag::LanguageModel;
    use crate::transcript::{TranscriptService, TranscriptSnippet, TranscriptTrack};
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::{StatusCode, Uri};

    struct OneTrack;

    #[async_trait]
    impl TranscriptService for OneTrack {
        async fn list_tracks(&self, video_id: &str) -> Result<Vec<TranscriptTrack>> {
            if video_id == "nocaptions" {
                return Err(VidqaError::TranscriptsDisabled(video_id.to_string()));
            }
            Ok(vec![TranscriptTrack {
                video_id: video_id.to_string(),
                language_code: "en".to_string(),
                name: "English".to_string(),
                is_generated: true,
                url: "https://example.invalid/en".to_string(),
            }])
        }

        async fn fetch_track(&self, _track: &TranscriptTrack) -> Result<Vec<TranscriptSnippet>> {
            Ok(vec![TranscriptSnippet::new("Cats are mammals.", 0.0, 2.0)])
        }
    }

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Embedding> {
            Ok(vec![1.0, text.len() as f32])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
            Ok(texts.iter().map(|t| vec![1.0, t.len() as f32]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    struct FixedModel;

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok("Cats are mammals.".to_string())
        }
    }

    fn state() -> Arc<AppState> {
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(OneTrack),
            Arc::new(LengthEmbedder),
            Arc::new(FixedModel),
            Arc::new(ProcessingCache::new()),
        )
        .unwrap();
        Arc::new(AppState { orchestrator })
    }

    async fn json(response: impl IntoResponse) -> (StatusCode, serde_json::Value) {
        let response = response.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn process_query(video_id: &str) -> Query<ProcessQuery> {
        Query(ProcessQuery {
            video_id: video_id.to_string(),
        })
    }

    fn ask_query(video_id: &str, question: &str) -> Query<AskQuery> {
        Query(AskQuery {
            video_id: video_id.to_string(),
            question: question.to_string(),
        })
    }

    #[tokio::test]
    async fn test_process_video_success() {
        let (status, body) = json(process_video(State(state()), process_query("abc123")).await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(
            body["message"],
            "Transcript processed successfully for video: abc123"
        );
    }

    #[tokio::test]
    async fn test_process_video_failure_is_ok_status() {
        let (status, body) = json(process_video(State(state()), process_query("nocaptions")).await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "failed");
        assert_eq!(body["message"], "Transcripts are disabled for this video.");
    }

    #[tokio::test]
    async fn test_ask_returns_answer() {
        let (status, body) = json(ask(State(state()), ask_query("abc123", "What are cats?")).await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "Cats are mammals.");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_ask_reports_errors_in_body() {
        let (status, body) = json(ask(State(state()), ask_query("nocaptions", "Why?")).await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], "Transcripts are disabled for this video.");
        assert!(body.get("answer").is_none());
    }

    #[test]
    fn test_query_parsing() {
        let uri: Uri = "/ask?video_id=abc123&question=What%20are%20cats%3F".parse().unwrap();
        let Query(query) = Query::<AskQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.video_id, "abc123");
        assert_eq!(query.question, "What are cats?");

        let uri: Uri = "/ask?video_id=abc123".parse().unwrap();
        let rejection = Query::<AskQuery>::try_from_uri(&uri).unwrap_err();
        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_videos_lists_processed_ids() {
        let state = state();
        let _ = process_video(State(state.clone()), process_query("abc123")).await;

        let (_, body) = json(list_videos(State(state)).await).await;

        assert_eq!(body["total"], 1);
        assert_eq!(body["videos"][0]["video_id"], "abc123");
        assert_eq!(body["videos"][0]["chunk_count"], 1);
    }

    #[test]
    fn test_router_builds() {
        let _app: Router = router(state());
    }
}
