//! Process command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::ProcessingError;
use crate::orchestrator::Orchestrator;
use crate::transcript::extract_video_id;
use anyhow::Result;

/// Run the process command.
pub async fn run_process(video: &str, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Process, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'vidqa doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let video_id = extract_video_id(video);
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Processing {}...", video_id));

    match orchestrator.ensure_processed(&video_id).await {
        Ok(entry) => {
            spinner.finish_and_clear();
            Output::success(&format!(
                "Transcript processed successfully for video: {}",
                video_id
            ));
            Output::kv("Chunks", &entry.chunk_count.to_string());
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&e.to_string());
            if e.is_retryable() {
                Output::info("This may be a temporary problem; try again.");
            } else if matches!(e, ProcessingError::ToolMissing(_)) {
                Output::info("Run 'vidqa doctor' for detailed diagnostics.");
            }
            Err(e.into())
        }
    }
}
