//! Implementation of the 'ask' subcommand.
//!
//! Loads a previous analysis result from disk and asks the hosted
//! text-generation model a question about it.

use crate::cli::AskArgs;
use crate::error::CliResult;

use deepsense_core::inference::HostedTextClient;
use deepsense_core::{AskRequest, AskResponse, CoreConfig, CoreError, answer_question};

use serde_json::Value;
use std::fs;

/// Builds the ask request from the command-line arguments.
pub fn build_ask_request(args: &AskArgs) -> CliResult<AskRequest> {
    let content = fs::read_to_string(&args.analysis).map_err(|e| {
        CoreError::Validation(format!(
            "Failed to read analysis file '{}': {}",
            args.analysis.display(),
            e
        ))
    })?;
    let analysis: Value = serde_json::from_str(&content).map_err(|e| {
        CoreError::Validation(format!(
            "Invalid analysis JSON in '{}': {}",
            args.analysis.display(),
            e
        ))
    })?;

    Ok(AskRequest {
        question: args.question.clone(),
        analysis,
    })
}

pub fn run_ask(args: &AskArgs, config: &CoreConfig) -> CliResult<AskResponse> {
    let request = build_ask_request(args)?;
    request.validate()?;

    let client = HostedTextClient::new(&config.backend)?;
    answer_question(&client, &request)
}
