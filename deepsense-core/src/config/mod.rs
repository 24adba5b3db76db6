//! Configuration structures and constants for the deepsense-core library.
//!
//! This module provides the configuration system for the analysis pipeline:
//! sampling parameters, worker pool sizing, inference backend selection and
//! persistence location. A configuration can be built in code, through
//! [`CoreConfigBuilder`], or loaded from a JSON file; environment variables
//! prefixed with `DEEPSENSE_` override individual fields.

mod builder;
pub mod utils;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::inference::BackendKind;
use crate::processing::aggregate::RepresentativeConfidence;
use utils::*;

pub use builder::CoreConfigBuilder;

// Default constants

/// Default number of frames sampled per video.
pub const DEFAULT_SAMPLE_COUNT: usize = 5;

/// Default width of extracted frames in pixels. Height follows the aspect ratio.
pub const DEFAULT_FRAME_WIDTH: u32 = 640;

/// Default square input resolution of the inference backend (MobileNet family).
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Default size of the per-frame worker pool.
pub const DEFAULT_WORKER_THREADS: usize = 5;

/// Default number of labels kept per frame by the classifier.
pub const DEFAULT_TOP_K: usize = 3;

/// Default minimum score for detector boxes.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Default IoU above which overlapping boxes of the same class are suppressed.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Default hosted text-generation model.
pub const DEFAULT_HOSTED_MODEL: &str = "gemini-2.0-flash";

/// Default location of the JSON-lines record store.
pub const DEFAULT_STORE_PATH: &str = "deepsense-videos.jsonl";

/// Settings for the inference backend. The backend is chosen once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Which backend capability to load
    pub kind: BackendKind,

    /// ONNX model file for the local backends
    pub model_path: Option<PathBuf>,

    /// Label file (one label per line, indexed by class id)
    pub labels_path: Option<PathBuf>,

    /// Square input resolution expected by the model
    pub input_size: u32,

    /// Number of labels kept per frame by the classifier
    pub top_k: usize,

    /// Minimum score for a classifier or detector prediction to be reported
    pub confidence_threshold: f32,

    /// IoU threshold for detector non-maximum suppression
    pub iou_threshold: f32,

    /// Base URL of the hosted text-generation API
    pub endpoint: Option<String>,

    /// Hosted model name
    pub model: String,

    /// Credential for the hosted API
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout for the hosted API, in seconds
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Classify,
            model_path: None,
            labels_path: None,
            input_size: DEFAULT_INPUT_SIZE,
            top_k: DEFAULT_TOP_K,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            endpoint: None,
            model: DEFAULT_HOSTED_MODEL.to_string(),
            api_key: None,
            request_timeout_secs: 30,
        }
    }
}

/// Main configuration structure for the deepsense-core library.
///
/// All fields have defaults, so a configuration only needs the backend model
/// (or hosted endpoint) to be usable.
///
/// # Examples
///
/// ```rust,no_run
/// use deepsense_core::config::CoreConfigBuilder;
/// use deepsense_core::inference::BackendKind;
///
/// let config = CoreConfigBuilder::new()
///     .sample_count(8)
///     .backend_kind(BackendKind::Detect)
///     .model_path("models/yolov5s.onnx")
///     .labels_path("models/coco.txt")
///     .input_size(640)
///     .build();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Optional base directory for per-run scratch directories
    /// (defaults to the system temp directory)
    pub temp_dir: Option<PathBuf>,

    /// Maximum number of frames sampled per video
    pub sample_count: usize,

    /// Width of extracted frames; height keeps the aspect ratio
    pub frame_width: u32,

    /// Size of the per-frame worker pool (capped at `sample_count`)
    pub worker_threads: usize,

    /// Serialize every backend call through a single lock
    pub serialize_inference: bool,

    /// Abandon a run after this many seconds
    pub run_timeout_secs: Option<u64>,

    /// How the representative confidence of a label is chosen
    pub confidence_policy: RepresentativeConfidence,

    /// JSON-lines file used by the default record store
    pub store_path: PathBuf,

    /// Inference backend settings
    pub backend: BackendConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            sample_count: DEFAULT_SAMPLE_COUNT,
            frame_width: DEFAULT_FRAME_WIDTH,
            worker_threads: DEFAULT_WORKER_THREADS,
            serialize_inference: false,
            run_timeout_secs: None,
            confidence_policy: RepresentativeConfidence::default(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            backend: BackendConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Loads a configuration from a JSON file. Missing fields take their
    /// default values.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            CoreError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Applies `DEEPSENSE_*` environment variable overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Some(dir) = get_env_path("DEEPSENSE_TEMP_DIR") {
            self.temp_dir = Some(dir);
        }
        self.sample_count = get_env_usize("DEEPSENSE_SAMPLE_COUNT", self.sample_count);
        self.frame_width = get_env_u32("DEEPSENSE_FRAME_WIDTH", self.frame_width);
        self.worker_threads = get_env_usize("DEEPSENSE_WORKERS", self.worker_threads);
        self.serialize_inference =
            get_env_bool("DEEPSENSE_SERIALIZE_INFERENCE", self.serialize_inference);
        if let Some(secs) = get_env_u64("DEEPSENSE_RUN_TIMEOUT") {
            self.run_timeout_secs = Some(secs);
        }
        if let Some(path) = get_env_path("DEEPSENSE_STORE_PATH") {
            self.store_path = path;
        }

        if let Some(kind) = get_env_string("DEEPSENSE_BACKEND") {
            match kind.parse::<BackendKind>() {
                Ok(kind) => self.backend.kind = kind,
                Err(e) => log::warn!("Ignoring DEEPSENSE_BACKEND: {}", e),
            }
        }
        if let Some(path) = get_env_path("DEEPSENSE_MODEL_PATH") {
            self.backend.model_path = Some(path);
        }
        if let Some(path) = get_env_path("DEEPSENSE_LABELS_PATH") {
            self.backend.labels_path = Some(path);
        }
        if let Some(endpoint) = get_env_string("DEEPSENSE_ENDPOINT") {
            self.backend.endpoint = Some(endpoint);
        }
        if let Some(key) = get_env_string("GEMINI_API_KEY") {
            self.backend.api_key = Some(key);
        }
    }

    /// Checks the configuration for values the pipeline cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.sample_count == 0 {
            return Err(CoreError::Config("sample_count must be at least 1".into()));
        }
        if self.frame_width == 0 {
            return Err(CoreError::Config("frame_width must be at least 1".into()));
        }
        if self.worker_threads == 0 {
            return Err(CoreError::Config("worker_threads must be at least 1".into()));
        }
        if self.backend.input_size == 0 {
            return Err(CoreError::Config("backend.input_size must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.backend.confidence_threshold) {
            return Err(CoreError::Config(
                "backend.confidence_threshold must be within [0, 1]".into(),
            ));
        }

        match self.backend.kind {
            BackendKind::Classify | BackendKind::Detect => {
                if self.backend.model_path.is_none() {
                    return Err(CoreError::Config(format!(
                        "backend.model_path is required for the {} backend",
                        self.backend.kind
                    )));
                }
            }
            BackendKind::TextGeneration => {
                if self.backend.endpoint.is_none() {
                    return Err(CoreError::Config(
                        "backend.endpoint is required for the text-generation backend".into(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Number of worker threads actually used: never more than the number of
    /// frames a run can produce.
    pub fn effective_workers(&self) -> usize {
        self.worker_threads.min(self.sample_count).max(1)
    }

    /// The run timeout as a `Duration`, if configured.
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }
}
