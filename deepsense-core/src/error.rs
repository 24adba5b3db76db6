// ============================================================================
// deepsense-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error Types for the Analysis Pipeline
//
// This module defines the error taxonomy used throughout deepsense-core.
// Errors fall into two groups:
//
// - Run-level errors (Validation, Decode, Persistence, Cancelled) that end a
//   request and cross the boundary as `{error, details}`.
// - Frame-level errors (Preprocess, Inference) that are logged by the pipeline
//   and cause only the offending frame to be skipped.
//
// External tool failures (ffmpeg/ffprobe) are reported through the command
// helper constructors at the bottom of this file.

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Custom error type for deepsense-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Missing or malformed input, detected before any processing starts.
    #[error("{0}")]
    Validation(String),

    /// Video unreachable, unsupported container/codec, or unreadable duration.
    #[error("Failed to decode video: {0}")]
    Decode(String),

    /// A single frame could not be converted into a tensor.
    #[error("Failed to preprocess frame {frame}: {reason}")]
    Preprocess { frame: usize, reason: String },

    /// The inference backend rejected the input or failed.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// The persistence collaborator failed to store the record.
    #[error("Failed to persist analysis: {0}")]
    Persistence(String),

    /// The run was cancelled (client disconnect or timeout).
    #[error("Analysis cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, io::Error),

    #[error("Failed to wait for command '{0}': {1}")]
    CommandWait(String, io::Error),

    #[error("Command '{0}' failed with status {1}: {2}")]
    CommandFailed(String, ExitStatus, String),

    #[error("Required dependency not found: {0}")]
    DependencyNotFound(String),
}

impl CoreError {
    /// Short, stable label for the error kind. Used at the request boundary
    /// and in log lines; never contains internal details.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::Decode(_) => "decode",
            CoreError::Preprocess { .. } => "preprocess",
            CoreError::Inference(_) => "inference",
            CoreError::Persistence(_) => "persistence",
            CoreError::Cancelled => "cancelled",
            CoreError::Config(_) => "config",
            CoreError::Io(_) => "io",
            CoreError::Json(_) => "json",
            CoreError::CommandStart(..)
            | CoreError::CommandWait(..)
            | CoreError::CommandFailed(..) => "command",
            CoreError::DependencyNotFound(_) => "dependency",
        }
    }

    /// Whether the error is scoped to one frame and should be recovered by
    /// skipping that frame.
    pub fn is_frame_scoped(&self) -> bool {
        matches!(self, CoreError::Preprocess { .. } | CoreError::Inference(_))
    }
}

/// Result type for deepsense-core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

// ============================================================================
// COMMAND ERROR HELPERS
// ============================================================================

pub fn command_start_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

pub fn command_wait_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandWait(cmd.into(), err)
}

pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed(cmd.into(), status, stderr.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(CoreError::Validation("x".into()).kind(), "validation");
        assert_eq!(CoreError::Decode("x".into()).kind(), "decode");
        assert_eq!(CoreError::Cancelled.kind(), "cancelled");
        assert_eq!(
            command_start_error("ffmpeg", io::Error::other("boom")).kind(),
            "command"
        );
    }

    #[test]
    fn test_frame_scoped_errors() {
        assert!(
            CoreError::Preprocess {
                frame: 1,
                reason: "bad".into(),
            }
            .is_frame_scoped()
        );
        assert!(CoreError::Inference("shape".into()).is_frame_scoped());
        assert!(!CoreError::Decode("gone".into()).is_frame_scoped());
        assert!(!CoreError::Persistence("down".into()).is_frame_scoped());
    }

    #[test]
    fn test_validation_message_is_bare() {
        let err = CoreError::Validation("videourl is required".into());
        assert_eq!(err.to_string(), "videourl is required");
    }
}
