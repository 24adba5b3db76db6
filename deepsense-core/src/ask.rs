//! Questions about a previous analysis, answered by the hosted model.

use serde_json::Value;

use crate::api::{AskRequest, AskResponse};
use crate::error::CoreResult;
use crate::inference::HostedTextClient;

/// Prompt embedding the analysis JSON ahead of the question.
pub fn ask_prompt(analysis: &Value, question: &str) -> String {
    format!("Based on this video analysis: {analysis}, answer: {question}")
}

/// Sends the question and returns the model's answer.
pub fn answer_question(client: &HostedTextClient, request: &AskRequest) -> CoreResult<AskResponse> {
    let question = request.validate()?;
    log::info!("Answering question about analysis ({} chars)", question.len());
    let answer = client.generate(&ask_prompt(&request.analysis, question))?;
    Ok(AskResponse {
        answer: answer.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_embeds_compact_json() {
        let analysis = json!({ "summary": "Video contains 2 cat(s)" });
        assert_eq!(
            ask_prompt(&analysis, "How many cats?"),
            "Based on this video analysis: {\"summary\":\"Video contains 2 cat(s)\"}, answer: How many cats?"
        );
    }
}
