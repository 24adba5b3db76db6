//! Core library for analyzing the content of remote videos.
//!
//! A video reference goes through a fixed sequence of stages: a bounded set
//! of evenly spaced frames is sampled with ffmpeg, each frame is normalized
//! into a tensor and run through an inference backend, and the predictions
//! of all frames are merged into per-label counts and a summary that is
//! stored as a record.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use deepsense_core::{AnalysisPipeline, AnalyzeRequest, CancelToken, CoreConfig, EngineLoader};
//! use std::path::PathBuf;
//!
//! let mut config = CoreConfig::default();
//! config.backend.model_path = Some(PathBuf::from("models/mobilenetv2-7.onnx"));
//! config.backend.labels_path = Some(PathBuf::from("models/imagenet_labels.txt"));
//! config.validate().unwrap();
//!
//! let loader = EngineLoader::new();
//! let pipeline = AnalysisPipeline::with_defaults(config, &loader).unwrap();
//!
//! let request = AnalyzeRequest::new("https://cdn.example.com/clip.mp4");
//! let outcome = pipeline.analyze(&request, &CancelToken::new()).unwrap();
//! println!("{}", outcome.analysis.summary);
//! ```

pub mod api;
pub mod ask;
pub mod config;
pub mod error;
pub mod external;
pub mod inference;
pub mod logging;
#[cfg(any(test, feature = "test-mocks"))]
pub mod mocks;
pub mod processing;
pub mod record;
pub mod temp_files;
pub mod utils;

// Re-exports for public API
pub use api::{AnalyzeRequest, AnalyzeResponse, AskRequest, AskResponse, ErrorResponse};
pub use ask::answer_question;
pub use config::{BackendConfig, CoreConfig, CoreConfigBuilder};
pub use error::{CoreError, CoreResult};
pub use external::check_dependency;
pub use inference::{BackendKind, EngineLoader, InferenceEngine, Prediction};
pub use processing::{
    AnalysisOutcome, AnalysisPipeline, AnalysisResult, CancelToken, RepresentativeConfidence,
    VideoReference,
};
pub use record::{JsonLinesStore, VideoRecord, VideoStore, build_record};
pub use utils::format_duration;
