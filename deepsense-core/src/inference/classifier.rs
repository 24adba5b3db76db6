//! ImageNet-style classifier running a local ONNX model through tract.
//!
//! The model takes a `[1, 3, size, size]` float input and returns one score
//! per class. Scores that are not already probabilities are passed through a
//! softmax before the `top_k` best classes scoring at least the confidence
//! threshold are reported.

use std::path::Path;

use tract_onnx::prelude::*;

use crate::config::BackendConfig;
use crate::error::{CoreError, CoreResult};
use crate::processing::preprocess::Tensor;

use tract_onnx::prelude::Tensor as TractTensor;

use super::{BackendKind, FrameContext, InferenceBackend, Prediction, label_for, load_labels};

pub(crate) type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

pub struct TractClassifier {
    model: RunnableModel,
    labels: Vec<String>,
    input_size: u32,
    top_k: usize,
    threshold: f32,
}

impl TractClassifier {
    pub fn load(config: &BackendConfig) -> CoreResult<Self> {
        let model_path = config
            .model_path
            .as_deref()
            .ok_or_else(|| CoreError::Config("classifier requires backend.model_path".into()))?;
        let labels = match config.labels_path.as_deref() {
            Some(path) => load_labels(path)?,
            None => Vec::new(),
        };
        let model = load_runnable(model_path, config.input_size)?;
        log::info!(
            "Loaded classifier {} ({} labels, input {}x{})",
            model_path.display(),
            labels.len(),
            config.input_size,
            config.input_size
        );

        Ok(Self {
            model,
            labels,
            input_size: config.input_size,
            top_k: config.top_k.max(1),
            threshold: config.confidence_threshold,
        })
    }
}

/// Loads an ONNX file and fixes its input to `[1, 3, size, size]`.
pub(crate) fn load_runnable(path: &Path, size: u32) -> CoreResult<RunnableModel> {
    let side = size as usize;
    let load = || {
        tract_onnx::onnx()
            .model_for_path(path)?
            .with_input_fact(0, f32::fact([1, 3, side, side]).into())?
            .into_optimized()?
            .into_runnable()
    };
    load().map_err(|e| {
        CoreError::Config(format!("Failed to load model {}: {}", path.display(), e))
    })
}

/// Runs `model` on `tensor` and returns the first output, flattened.
pub(crate) fn run_model(
    model: &RunnableModel,
    tensor: &Tensor,
) -> CoreResult<(Vec<usize>, Vec<f32>)> {
    let side = tensor.size() as usize;
    let input = TractTensor::from_shape(&[1, 3, side, side], tensor.to_nchw().as_slice())
        .map_err(|e| CoreError::Inference(format!("building model input: {e}")))?;

    let outputs = model
        .run(tvec!(input.into_tvalue()))
        .map_err(|e| CoreError::Inference(format!("model run: {e}")))?;
    let first = outputs
        .first()
        .ok_or_else(|| CoreError::Inference("model produced no output".into()))?;
    let view = first
        .to_array_view::<f32>()
        .map_err(|e| CoreError::Inference(format!("model output: {e}")))?;

    Ok((view.shape().to_vec(), view.iter().copied().collect()))
}

/// Returns the scores as probabilities, applying a softmax when they are
/// logits (any value outside `[0, 1]` or a total far from 1).
pub fn to_probabilities(scores: &[f32]) -> Vec<f32> {
    let sum: f32 = scores.iter().sum();
    let already = scores.iter().all(|s| (0.0..=1.0).contains(s)) && (sum - 1.0).abs() < 1e-3;
    if already {
        return scores.to_vec();
    }

    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// `(class id, probability)` of the `k` most likely classes, best first.
/// Ties keep the lower class id first.
pub fn top_k(probabilities: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k);
    ranked
}

/// `top_k` without the classes scoring below `threshold`.
pub fn confident_top_k(probabilities: &[f32], k: usize, threshold: f32) -> Vec<(usize, f32)> {
    top_k(probabilities, k)
        .into_iter()
        .filter(|&(_, p)| p >= threshold)
        .collect()
}

impl InferenceBackend for TractClassifier {
    fn kind(&self) -> BackendKind {
        BackendKind::Classify
    }

    fn input_size(&self) -> Option<u32> {
        Some(self.input_size)
    }

    fn predict(&self, tensor: &Tensor, context: &FrameContext<'_>) -> CoreResult<Vec<Prediction>> {
        let (shape, scores) = run_model(&self.model, tensor)?;
        if scores.is_empty() {
            return Err(CoreError::Inference(format!(
                "classifier output {shape:?} is empty"
            )));
        }

        let probabilities = to_probabilities(&scores);
        let predictions: Vec<Prediction> =
            confident_top_k(&probabilities, self.top_k, self.threshold)
                .into_iter()
                .map(|(id, p)| Prediction::new(label_for(&self.labels, id), p))
                .collect();

        log::debug!(
            "Frame {} classified: {:?}",
            context.index,
            predictions
                .iter()
                .map(|p| format!("{} {:.3}", p.label, p.confidence))
                .collect::<Vec<_>>()
        );
        Ok(predictions)
    }
}
