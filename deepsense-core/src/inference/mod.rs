// ============================================================================
// deepsense-core/src/inference/mod.rs
// ============================================================================
//
// INFERENCE: Pluggable Image Analysis Backends
//
// Every backend turns one preprocessed tensor into a list of predictions. The
// capability is chosen once, from configuration, as a BackendKind:
//
// - Classify: local ONNX image classifier (tract-onnx), top-k labels
// - Detect: local ONNX YOLO-style detector (tract-onnx), boxes after NMS
// - TextGeneration: hosted generateContent-style API, free-form text parsed
//   into labels
//
// KEY COMPONENTS:
// - InferenceBackend: the unifying trait
// - InferenceEngine: validates tensors, gates concurrency, sanitizes output
// - EngineLoader: single-flight, process-wide engine initialization

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::processing::preprocess::Tensor;
use crate::processing::types::VideoReference;

// ============================================================================
// SUBMODULES
// ============================================================================

pub mod classifier;
pub mod detector;
pub mod engine;
pub mod hosted;

pub use classifier::TractClassifier;
pub use detector::TractDetector;
pub use engine::{EngineLoader, InferenceEngine};
pub use hosted::{HostedTextBackend, HostedTextClient};

// ============================================================================
// TYPES
// ============================================================================

/// Axis-aligned box in coordinates normalized to the model input square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        (self.x_max - self.x_min).max(0.0) * (self.y_max - self.y_min).max(0.0)
    }

    /// Intersection over union with `other`.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let width = (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0);
        let height = (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0);
        let intersection = width * height;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 { 0.0 } else { intersection / union }
    }
}

/// One label the backend found in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    /// In `[0, 1]`
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox: None,
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

/// Backend capability selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    Classify,
    Detect,
    TextGeneration,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Classify => "classify",
            BackendKind::Detect => "detect",
            BackendKind::TextGeneration => "text-generation",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classify" | "classification" => Ok(BackendKind::Classify),
            "detect" | "detection" => Ok(BackendKind::Detect),
            "text-generation" | "text_generation" | "hosted" => Ok(BackendKind::TextGeneration),
            other => Err(CoreError::Config(format!("unknown backend kind '{other}'"))),
        }
    }
}

/// Where the tensor came from. Hosted backends use it to build their prompt.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub reference: &'a VideoReference,
    pub index: usize,
    pub timestamp_secs: f64,
}

/// A model that turns one tensor into predictions.
pub trait InferenceBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Side of the square tensor the backend accepts, if it requires one.
    fn input_size(&self) -> Option<u32>;

    /// Whether `predict` may be called from several threads at once.
    fn supports_concurrent_calls(&self) -> bool {
        true
    }

    fn predict(&self, tensor: &Tensor, context: &FrameContext<'_>) -> CoreResult<Vec<Prediction>>;
}

impl<T: InferenceBackend + ?Sized> InferenceBackend for std::sync::Arc<T> {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn input_size(&self) -> Option<u32> {
        (**self).input_size()
    }

    fn supports_concurrent_calls(&self) -> bool {
        (**self).supports_concurrent_calls()
    }

    fn predict(&self, tensor: &Tensor, context: &FrameContext<'_>) -> CoreResult<Vec<Prediction>> {
        (**self).predict(tensor, context)
    }
}

/// Reads a label file: one label per line, indexed by class id. Blank lines
/// keep their slot so ids stay aligned.
pub fn load_labels(path: &Path) -> CoreResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CoreError::Config(format!("Failed to read label file {}: {}", path.display(), e))
    })?;
    Ok(content.lines().map(|line| line.trim().to_string()).collect())
}

/// Label of class `id`, falling back to `class_{id}`.
pub(crate) fn label_for(labels: &[String], id: usize) -> String {
    labels
        .get(id)
        .filter(|label| !label.is_empty())
        .cloned()
        .unwrap_or_else(|| format!("class_{id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("classify".parse::<BackendKind>().unwrap(), BackendKind::Classify);
        assert_eq!("Detect".parse::<BackendKind>().unwrap(), BackendKind::Detect);
        assert_eq!(
            "text-generation".parse::<BackendKind>().unwrap(),
            BackendKind::TextGeneration
        );
        assert!("segment".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::TextGeneration.to_string(), "text-generation");
    }

    #[test]
    fn test_iou() {
        let a = BoundingBox {
            x_min: 0.0,
            y_min: 0.0,
            x_max: 2.0,
            y_max: 2.0,
        };
        let b = BoundingBox {
            x_min: 1.0,
            y_min: 1.0,
            x_max: 3.0,
            y_max: 3.0,
        };
        let far = BoundingBox {
            x_min: 5.0,
            y_min: 5.0,
            x_max: 6.0,
            y_max: 6.0,
        };
        assert!((a.iou(&b) - 1.0 / 7.0).abs() < 1e-6);
        assert_eq!(a.iou(&far), 0.0);
        assert_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_label_fallback() {
        let labels = vec!["cat".to_string(), String::new()];
        assert_eq!(label_for(&labels, 0), "cat");
        assert_eq!(label_for(&labels, 1), "class_1");
        assert_eq!(label_for(&labels, 9), "class_9");
    }
}
