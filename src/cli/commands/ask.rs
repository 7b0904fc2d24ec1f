//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::transcript::extract_video_id;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(video: &str, question: &str, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Process, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'vidqa doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let video_id = extract_video_id(video);
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Reading the transcript...");

    match orchestrator.get_answer(&video_id, question).await {
        Ok(answer) => {
            spinner.finish_and_clear();
            println!("\n{}\n", answer);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&e.to_string());
            return Err(e.into());
        }
    }

    Ok(())
}
