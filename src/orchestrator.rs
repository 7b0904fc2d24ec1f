//! Pipeline orchestrator for vidqa.
//!
//! Coordinates the per-video pipeline from transcript fetching to a cached,
//! ready-to-query answer generator.

use crate::cache::{CachedVideo, ProcessingCache, ProcessingEntry};
use crate::chunking::{create_chunker, Chunker, RecursiveChunker};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{ProcessingError, RequestError, Result, Unavailable, VidqaError};
use crate::rag::{AnswerGenerator, LanguageModel, OpenAIChatModel, VectorRetriever};
use crate::transcript::{TranscriptFetcher, TranscriptResult, TranscriptService, YtDlpTranscriptService};
use crate::vector_store::MemoryVectorIndex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// The main orchestrator for the vidqa pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Arc<Prompts>,
    fetcher: TranscriptFetcher,
    chunker: RecursiveChunker,
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn LanguageModel>,
    cache: Arc<ProcessingCache>,
}

impl Orchestrator {
    /// Create an orchestrator backed by yt-dlp and OpenAI, with an empty cache.
    pub fn new(settings: Settings) -> Result<Self> {
        // Load prompts (with optional custom directory and variables)
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let timeout = Duration::from_secs(settings.generation.request_timeout_secs);

        let transcripts = Arc::new(YtDlpTranscriptService::with_config(&settings.transcript)?);
        let embedder = Arc::new(OpenAIEmbedder::with_config(&settings.embedding, timeout)?);
        let model = Arc::new(OpenAIChatModel::new(&settings.generation)?);

        info!(
            "Using {} for embeddings and {} for answers",
            settings.embedding.model, settings.generation.model
        );

        Self::with_components(
            settings,
            prompts,
            transcripts,
            embedder,
            model,
            Arc::new(ProcessingCache::new()),
        )
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        transcripts: Arc<dyn TranscriptService>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
        cache: Arc<ProcessingCache>,
    ) -> Result<Self> {
        settings.validate()?;
        let chunker = create_chunker(&settings.chunking)?;

        Ok(Self {
            settings,
            prompts: Arc::new(prompts),
            fetcher: TranscriptFetcher::new(transcripts),
            chunker,
            embedder,
            model,
            cache,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the processing cache.
    pub fn cache(&self) -> Arc<ProcessingCache> {
        self.cache.clone()
    }

    /// Videos that are ready to be queried.
    pub async fn cached_videos(&self) -> Vec<CachedVideo> {
        self.cache.list().await
    }

    /// Make sure a video's pipeline is built and cached, building it if needed.
    ///
    /// A cached video returns immediately. Otherwise the transcript is fetched,
    /// chunked, embedded and indexed, and the answer generator is published to
    /// the cache. Nothing is cached on failure.
    #[instrument(skip(self))]
    pub async fn ensure_processed(
        &self,
        video_id: &str,
    ) -> std::result::Result<Arc<ProcessingEntry>, ProcessingError> {
        let video_id = video_id.trim();
        if video_id.is_empty() {
            return Err(ProcessingError::EmptyVideoId);
        }

        if let Some(entry) = self.cache.get(video_id).await {
            info!("Already cached: {}", video_id);
            return Ok(entry);
        }

        info!("Processing video {}", video_id);

        let transcript = match self.fetcher.fetch(video_id).await {
            TranscriptResult::Available(text) => text,
            TranscriptResult::Disabled => {
                warn!("Transcripts are disabled for {}", video_id);
                return Err(ProcessingError::TranscriptUnavailable(Unavailable::Disabled));
            }
            TranscriptResult::NotFound => {
                warn!("No English or Hindi transcript for {}", video_id);
                return Err(ProcessingError::TranscriptUnavailable(Unavailable::NotFound));
            }
            TranscriptResult::ToolMissing(detail) => {
                error!("Fetching transcript for {} failed: {}", video_id, detail);
                return Err(ProcessingError::ToolMissing(detail));
            }
            TranscriptResult::FetchError(detail) => {
                error!("Fetching transcript for {} failed: {}", video_id, detail);
                return Err(ProcessingError::FetchFault(detail));
            }
        };

        info!("Transcript length: {} chars", transcript.chars().count());

        let entry = self.build_entry(&transcript).await.map_err(|e| {
            error!("Building pipeline for {} failed: {}", video_id, e);
            ProcessingError::PipelineFault(e.to_string())
        })?;

        let total = self.cache.insert(video_id, entry.clone()).await;
        info!(
            "Cached {} ({} chunks); {} videos in cache",
            video_id, entry.chunk_count, total
        );

        Ok(entry)
    }

    /// Answer a question about a video, processing the video first if needed.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn get_answer(
        &self,
        video_id: &str,
        question: &str,
    ) -> std::result::Result<String, RequestError> {
        if !self.cache.contains(video_id.trim()).await {
            info!("Video {} not processed yet, processing now", video_id.trim());
        }

        let entry = self.ensure_processed(video_id).await?;

        entry.generator.answer(question).await.map_err(|e| {
            error!("Answering question for {} failed: {}", video_id, e);
            RequestError::GenerationFault(e.to_string())
        })
    }

    /// Chunk, embed and index a transcript, and bind a generator to the index.
    async fn build_entry(&self, transcript: &str) -> Result<Arc<ProcessingEntry>> {
        let chunks = self.chunker.chunk(transcript);
        if chunks.is_empty() {
            return Err(VidqaError::Chunking("transcript produced no chunks".to_string()));
        }
        let chunk_count = chunks.len();

        // Generate embeddings in batch
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let index = MemoryVectorIndex::build(chunks, embeddings)?;

        let retriever = Arc::new(
            VectorRetriever::new(Arc::new(index), self.embedder.clone())
                .with_top_k(self.settings.retrieval.top_k),
        );
        let generator = Arc::new(AnswerGenerator::new(
            retriever.clone(),
            self.model.clone(),
            self.prompts.clone(),
        ));

        Ok(Arc::new(ProcessingEntry::new(retriever, generator, chunk_count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedding;
    use crate::transcript::{TranscriptSnippet, TranscriptTrack};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CATS: &str = "Cats are mammals. Dogs are mammals too.";

    /// Serves one English track with a fixed text; can fail a number of times first.
    struct FakeTranscripts {
        text: String,
        disabled: bool,
        failures_left: AtomicUsize,
        list_calls: AtomicUsize,
    }

    impl FakeTranscripts {
        fn new(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: text.to_string(),
                disabled: false,
                failures_left: AtomicUsize::new(0),
                list_calls: AtomicUsize::new(0),
            })
        }

        fn failing_once(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: text.to_string(),
                disabled: false,
                failures_left: AtomicUsize::new(1),
                list_calls: AtomicUsize::new(0),
            })
        }

        fn disabled() -> Arc<Self> {
            Arc::new(Self {
                text: String::new(),
                disabled: true,
                failures_left: AtomicUsize::new(0),
                list_calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranscriptService for FakeTranscripts {
        async fn list_tracks(&self, video_id: &str) -> Result<Vec<TranscriptTrack>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);

            if self.disabled {
                return Err(VidqaError::TranscriptsDisabled(video_id.to_string()));
            }
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(VidqaError::TranscriptService("connection reset".to_string()));
            }

            Ok(vec![TranscriptTrack {
                video_id: video_id.to_string(),
                language_code: "en".to_string(),
                name: "English".to_string(),
                is_generated: false,
                url: "https://example.invalid/en".to_string(),
            }])
        }

        async fn fetch_track(&self, _track: &TranscriptTrack) -> Result<Vec<TranscriptSnippet>> {
            Ok(vec![TranscriptSnippet::new(self.text.clone(), 0.0, 5.0)])
        }
    }

    /// Hashes words into a small bag-of-words vector and counts batch calls.
    #[derive(Default)]
    struct CountingEmbedder {
        batch_calls: AtomicUsize,
        fail: bool,
    }

    impl CountingEmbedder {
        fn failing() -> Arc<Self> {
            Arc::new(Self {
                batch_calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.batch_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Embedding> {
            let mut vector = vec![0.0; 16];
            for word in text.split_whitespace() {
                let word = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
                if word.is_empty() {
                    continue;
                }
                let bucket = word.bytes().map(usize::from).sum::<usize>() % 16;
                vector[bucket] += 1.0;
            }
            Ok(vector)
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(VidqaError::Embedding("quota exceeded".to_string()));
            }
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            16
        }
    }

    /// Answers with the transcript passages it was given.
    struct EchoModel;

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn complete(&self, prompt: &str) -> Result<String> {
            let context = prompt
                .split("Transcript:\n")
                .nth(1)
                .and_then(|rest| rest.split("\n\nQuestion:").next())
                .unwrap_or_default();
            Ok(format!("  {}  ", context))
        }
    }

    struct BrokenModel;

    #[async_trait]
    impl LanguageModel for BrokenModel {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(VidqaError::OpenAI("503 Service Unavailable".to_string()))
        }
    }

    fn orchestrator(
        transcripts: Arc<FakeTranscripts>,
        embedder: Arc<CountingEmbedder>,
        model: Arc<dyn LanguageModel>,
    ) -> Orchestrator {
        Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            transcripts,
            embedder,
            model,
            Arc::new(ProcessingCache::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_ensure_processed_is_idempotent() {
        let transcripts = FakeTranscripts::new(CATS);
        let embedder = Arc::new(CountingEmbedder::default());
        let orch = orchestrator(transcripts.clone(), embedder.clone(), Arc::new(EchoModel));

        let first = orch.ensure_processed("abc123").await.unwrap();
        let second = orch.ensure_processed("abc123").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(transcripts.calls(), 1);
        assert_eq!(embedder.calls(), 1);
        assert_eq!(orch.cache().len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_processing_leaves_no_entry_and_retries() {
        let transcripts = FakeTranscripts::failing_once(CATS);
        let embedder = Arc::new(CountingEmbedder::default());
        let orch = orchestrator(transcripts.clone(), embedder.clone(), Arc::new(EchoModel));

        let err = orch.ensure_processed("abc123").await.unwrap_err();
        assert!(matches!(err, ProcessingError::FetchFault(_)));
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("Error fetching transcript: "));
        assert!(!orch.cache().contains("abc123").await);
        assert_eq!(embedder.calls(), 0);

        orch.ensure_processed("abc123").await.unwrap();
        assert_eq!(transcripts.calls(), 2);
        assert!(orch.cache().contains("abc123").await);
    }

    #[tokio::test]
    async fn test_disabled_transcripts_are_reported() {
        let orch = orchestrator(
            FakeTranscripts::disabled(),
            Arc::new(CountingEmbedder::default()),
            Arc::new(EchoModel),
        );

        let err = orch.ensure_processed("abc123").await.unwrap_err();

        assert_eq!(err.to_string(), "Transcripts are disabled for this video.");
        assert!(!err.is_retryable());
        assert!(orch.cache().is_empty().await);
    }

    struct NoTool;

    #[async_trait]
    impl TranscriptService for NoTool {
        async fn list_tracks(&self, _video_id: &str) -> Result<Vec<TranscriptTrack>> {
            Err(VidqaError::ToolNotFound("yt-dlp".to_string()))
        }

        async fn fetch_track(&self, _track: &TranscriptTrack) -> Result<Vec<TranscriptSnippet>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_missing_tool_is_not_retryable() {
        let orch = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(NoTool),
            Arc::new(CountingEmbedder::default()),
            Arc::new(EchoModel),
            Arc::new(ProcessingCache::new()),
        )
        .unwrap();

        let err = orch.ensure_processed("abc123").await.unwrap_err();

        assert!(matches!(err, ProcessingError::ToolMissing(_)));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("yt-dlp"));
        assert!(orch.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_a_pipeline_fault() {
        let orch = orchestrator(
            FakeTranscripts::new(CATS),
            CountingEmbedder::failing(),
            Arc::new(EchoModel),
        );

        let err = orch.ensure_processed("abc123").await.unwrap_err();

        match err {
            ProcessingError::PipelineFault(cause) => assert!(cause.contains("quota exceeded")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(orch.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_blank_video_id_is_rejected() {
        let transcripts = FakeTranscripts::new(CATS);
        let orch = orchestrator(
            transcripts.clone(),
            Arc::new(CountingEmbedder::default()),
            Arc::new(EchoModel),
        );

        assert_eq!(
            orch.ensure_processed("  ").await.unwrap_err(),
            ProcessingError::EmptyVideoId
        );
        assert_eq!(transcripts.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_transcript_counts_as_missing() {
        let orch = orchestrator(
            FakeTranscripts::new("   "),
            Arc::new(CountingEmbedder::default()),
            Arc::new(EchoModel),
        );

        // A whitespace-only track counts as missing.
        let err = orch.ensure_processed("abc123").await.unwrap_err();
        assert_eq!(err, ProcessingError::TranscriptUnavailable(Unavailable::NotFound));
    }

    #[tokio::test]
    async fn test_answer_about_cats() {
        let orch = orchestrator(
            FakeTranscripts::new(CATS),
            Arc::new(CountingEmbedder::default()),
            Arc::new(EchoModel),
        );

        orch.ensure_processed("cats").await.unwrap();
        let answer = orch.get_answer("cats", "What are cats?").await.unwrap();

        assert!(answer.contains("mammals"));
        assert_eq!(answer, answer.trim());
    }

    #[tokio::test]
    async fn test_top_k_over_fewer_chunks_returns_all() {
        let orch = orchestrator(
            FakeTranscripts::new(CATS),
            Arc::new(CountingEmbedder::default()),
            Arc::new(EchoModel),
        );

        let entry = orch.ensure_processed("cats").await.unwrap();
        let chunks = entry.retriever.retrieve("What are cats?").await.unwrap();

        assert_eq!(entry.chunk_count, 1);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, CATS);
    }

    #[tokio::test]
    async fn test_retrieval_is_capped_at_top_k() {
        let text = (0..40)
            .map(|i| format!("Paragraph {} is about subject number {}.", i, i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let mut settings = Settings::default();
        settings.chunking.chunk_size = 100;
        settings.chunking.chunk_overlap = 20;
        let orch = Orchestrator::with_components(
            settings,
            Prompts::default(),
            FakeTranscripts::new(&text),
            Arc::new(CountingEmbedder::default()),
            Arc::new(EchoModel),
            Arc::new(ProcessingCache::new()),
        )
        .unwrap();

        let entry = orch.ensure_processed("long").await.unwrap();
        let chunks = entry.retriever.retrieve("subject number 7").await.unwrap();

        assert!(entry.chunk_count > 4);
        assert_eq!(chunks.len(), 4);
    }

    #[tokio::test]
    async fn test_get_answer_processes_implicitly() {
        let implicit_transcripts = FakeTranscripts::new(CATS);
        let implicit = orchestrator(
            implicit_transcripts.clone(),
            Arc::new(CountingEmbedder::default()),
            Arc::new(EchoModel),
        );
        let explicit = orchestrator(
            FakeTranscripts::new(CATS),
            Arc::new(CountingEmbedder::default()),
            Arc::new(EchoModel),
        );

        let answer = implicit.get_answer("cats", "What are cats?").await.unwrap();
        explicit.ensure_processed("cats").await.unwrap();
        let expected = explicit.get_answer("cats", "What are cats?").await.unwrap();

        assert_eq!(answer, expected);
        assert_eq!(implicit_transcripts.calls(), 1);
        assert!(implicit.cache().contains("cats").await);
    }

    #[tokio::test]
    async fn test_get_answer_reports_processing_errors_verbatim() {
        let orch = orchestrator(
            FakeTranscripts::disabled(),
            Arc::new(CountingEmbedder::default()),
            Arc::new(EchoModel),
        );

        let err = orch.get_answer("abc123", "anything?").await.unwrap_err();

        assert_eq!(err.to_string(), "Transcripts are disabled for this video.");
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_the_entry() {
        let orch = orchestrator(
            FakeTranscripts::new(CATS),
            Arc::new(CountingEmbedder::default()),
            Arc::new(BrokenModel),
        );

        let err = orch.get_answer("cats", "What are cats?").await.unwrap_err();

        assert!(matches!(err, RequestError::GenerationFault(_)));
        assert!(err.to_string().starts_with("Failed to generate answer: "));
        assert!(orch.cache().contains("cats").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_requests_publish_one_entry() {
        let transcripts = FakeTranscripts::new(CATS);
        let orch = Arc::new(orchestrator(
            transcripts.clone(),
            Arc::new(CountingEmbedder::default()),
            Arc::new(EchoModel),
        ));

        let (a, b) = tokio::join!(
            orch.get_answer("cats", "What are cats?"),
            orch.get_answer("cats", "What are dogs?")
        );

        assert!(a.unwrap().contains("mammals"));
        assert!(b.unwrap().contains("mammals"));
        assert_eq!(orch.cache().len().await, 1);
        assert!((1..=2).contains(&transcripts.calls()));
    }
}
