//! Implementation of the 'analyze' subcommand.
//!
//! Builds the analysis request from `--url` or a JSON request file, rejects
//! it before anything expensive happens, then loads the inference engine and
//! runs the pipeline once.

use crate::cli::AnalyzeArgs;
use crate::error::CliResult;

use deepsense_core::{
    AnalysisOutcome, AnalysisPipeline, AnalyzeRequest, CancelToken, CoreConfig, CoreError,
    EngineLoader, format_duration,
};

use std::fs;
use std::path::Path;
use std::time::Instant;

use log::{debug, info};

/// Reads a request body such as `{"videourl": "https://..."}` from a file.
pub fn read_request_file(path: &Path) -> CliResult<AnalyzeRequest> {
    let content = fs::read_to_string(path).map_err(|e| {
        CoreError::Validation(format!("Failed to read request file '{}': {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        CoreError::Validation(format!("Invalid request body in '{}': {}", path.display(), e))
    })
}

/// The request described by the command-line arguments.
pub fn build_request(args: &AnalyzeArgs) -> CliResult<AnalyzeRequest> {
    match (&args.url, &args.request) {
        (Some(url), _) => Ok(AnalyzeRequest::new(url.clone())),
        (None, Some(path)) => read_request_file(path),
        (None, None) => Ok(AnalyzeRequest::default()),
    }
}

/// Runs the 'analyze' command and returns the outcome of the run.
pub fn run_analyze(args: &AnalyzeArgs, config: CoreConfig) -> CliResult<AnalysisOutcome> {
    let start_time = Instant::now();
    let request = build_request(args)?;
    // Reject bad input before the model is loaded.
    let reference = request.validate()?;

    info!("Analysis started: {} ({})", reference, chrono::Local::now());
    let cancel = match config.run_timeout() {
        Some(timeout) => {
            debug!("Run timeout: {}s", timeout.as_secs());
            CancelToken::with_timeout(timeout)
        }
        None => CancelToken::new(),
    };

    let loader = EngineLoader::new();
    let pipeline = AnalysisPipeline::with_defaults(config, &loader)?;
    let outcome = pipeline.analyze_reference(reference, &cancel)?;

    info!(
        "Analysis finished in {}: {} (record {})",
        format_duration(start_time.elapsed().as_secs_f64()),
        outcome.analysis.summary,
        outcome.record_id
    );
    Ok(outcome)
}
