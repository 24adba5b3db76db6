// ============================================================================
// deepsense-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// This module implements the builder pattern for the CoreConfig structure,
// providing a fluent API for creating and configuring CoreConfig instances
// with sensible defaults.

// ---- Standard library imports ----
use std::path::PathBuf;

// ---- Internal crate imports ----
use super::CoreConfig;
use crate::inference::BackendKind;
use crate::processing::aggregate::RepresentativeConfidence;

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use deepsense_core::config::CoreConfigBuilder;
/// use deepsense_core::inference::BackendKind;
///
/// let config = CoreConfigBuilder::new()
///     .sample_count(5)
///     .worker_threads(3)
///     .backend_kind(BackendKind::TextGeneration)
///     .endpoint("https://generativelanguage.googleapis.com/v1")
///     .api_key("secret")
///     .build();
///
/// assert_eq!(config.sample_count, 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// Creates a new CoreConfigBuilder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base directory for per-run scratch directories.
    pub fn temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(temp_dir.into());
        self
    }

    /// Sets the maximum number of frames sampled per video.
    pub fn sample_count(mut self, count: usize) -> Self {
        self.config.sample_count = count;
        self
    }

    /// Sets the width of extracted frames.
    pub fn frame_width(mut self, width: u32) -> Self {
        self.config.frame_width = width;
        self
    }

    /// Sets the size of the per-frame worker pool.
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.config.worker_threads = threads;
        self
    }

    /// Forces all backend calls through a single lock.
    pub fn serialize_inference(mut self, serialize: bool) -> Self {
        self.config.serialize_inference = serialize;
        self
    }

    /// Sets the run timeout in seconds.
    pub fn run_timeout_secs(mut self, secs: u64) -> Self {
        self.config.run_timeout_secs = Some(secs);
        self
    }

    /// Sets the representative confidence policy of the aggregator.
    pub fn confidence_policy(mut self, policy: RepresentativeConfidence) -> Self {
        self.config.confidence_policy = policy;
        self
    }

    /// Sets the JSON-lines file used by the default record store.
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = path.into();
        self
    }

    /// Selects the inference backend.
    pub fn backend_kind(mut self, kind: BackendKind) -> Self {
        self.config.backend.kind = kind;
        self
    }

    /// Sets the ONNX model file for the local backends.
    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backend.model_path = Some(path.into());
        self
    }

    /// Sets the label file for the local backends.
    pub fn labels_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backend.labels_path = Some(path.into());
        self
    }

    /// Sets the square input resolution of the model.
    pub fn input_size(mut self, size: u32) -> Self {
        self.config.backend.input_size = size;
        self
    }

    /// Sets the number of labels kept per frame by the classifier.
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.config.backend.top_k = top_k;
        self
    }

    /// Sets the minimum reported prediction score.
    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.config.backend.confidence_threshold = threshold;
        self
    }

    /// Sets the hosted API base URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.backend.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the hosted model name.
    pub fn hosted_model(mut self, model: impl Into<String>) -> Self {
        self.config.backend.model = model.into();
        self
    }

    /// Sets the hosted API credential.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.backend.api_key = Some(key.into());
        self
    }

    /// Builds the CoreConfig. Call [`CoreConfig::validate`] before use.
    pub fn build(self) -> CoreConfig {
        self.config
    }
}
