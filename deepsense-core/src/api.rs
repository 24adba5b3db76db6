//! Request and response shapes exchanged at the ingress boundary.
//!
//! Successful analyses are reported as
//! `{"success": true, "detectedObjects": [...], "summary": "..."}` and every
//! failure as `{"error": "<kind>", "details": "<message>"}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::processing::aggregate::AnalysisResult;
use crate::processing::types::VideoReference;

/// Body of an analysis request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub videourl: Option<String>,
}

impl AnalyzeRequest {
    pub fn new(videourl: impl Into<String>) -> Self {
        Self {
            videourl: Some(videourl.into()),
        }
    }

    /// The validated video reference. Missing or blank `videourl` is a
    /// validation error.
    pub fn validate(&self) -> CoreResult<VideoReference> {
        match self.videourl.as_deref() {
            Some(raw) => VideoReference::parse(raw),
            None => Err(CoreError::Validation("videourl is required".to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeSuccess {
    pub success: bool,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
}

/// Failure shape shared by every boundary operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short error kind label
    pub error: String,
    /// Human-readable message
    pub details: String,
}

impl From<&CoreError> for ErrorResponse {
    fn from(err: &CoreError) -> Self {
        Self {
            error: err.kind().to_string(),
            details: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalyzeResponse {
    Success(AnalyzeSuccess),
    Failure(ErrorResponse),
}

impl AnalyzeResponse {
    pub fn success(analysis: AnalysisResult) -> Self {
        AnalyzeResponse::Success(AnalyzeSuccess {
            success: true,
            analysis,
        })
    }

    pub fn failure(err: &CoreError) -> Self {
        AnalyzeResponse::Failure(err.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalyzeResponse::Success(_))
    }
}

/// Body of a question about a previous analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub analysis: Value,
}

impl AskRequest {
    /// The trimmed question. Missing or blank questions are rejected.
    pub fn validate(&self) -> CoreResult<&str> {
        self.question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| CoreError::Validation("question is required".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}
