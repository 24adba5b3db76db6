// ============================================================================
// deepsense-core/src/processing/mod.rs
// ============================================================================
//
// VIDEO PROCESSING: Sampling, Preprocessing and Aggregation
//
// This module contains the stages of the analysis pipeline that do not talk
// to an inference backend directly, plus the pipeline that wires every stage
// together.
//
// KEY COMPONENTS:
// - sampler: evenly spaced frame selection through a FrameDecoder
// - preprocess: frame to fixed-shape tensor conversion
// - aggregate: per-label counts, representative confidences and summary
// - run: per-request scratch state and cancellation
// - pipeline: AnalysisPipeline, the orchestration of one request

pub mod aggregate;
pub mod pipeline;
pub mod preprocess;
pub mod run;
pub mod sampler;
pub mod types;

pub use aggregate::{AggregatedObject, AnalysisResult, RepresentativeConfidence, aggregate};
pub use pipeline::{AnalysisOutcome, AnalysisPipeline};
pub use preprocess::{Preprocessor, Tensor};
pub use run::{CancelToken, PipelineRun};
pub use sampler::{FrameSampler, sample_timestamps};
pub use types::{Frame, VideoReference};
