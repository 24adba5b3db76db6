//! Inference engine: the single entry point the pipeline calls per frame.
//!
//! Wraps one backend and enforces what every backend must honor regardless of
//! its implementation:
//!
//! * tensors must match the backend's input size;
//! * backends that cannot be called concurrently are called under a lock;
//! * predictions leave the engine with a finite confidence in `[0, 1]`.

use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::config::BackendConfig;
use crate::error::{CoreError, CoreResult};
use crate::processing::preprocess::Tensor;

use super::{
    BackendKind, FrameContext, HostedTextBackend, InferenceBackend, Prediction, TractClassifier,
    TractDetector,
};

pub struct InferenceEngine {
    backend: Box<dyn InferenceBackend>,
    gate: Option<Mutex<()>>,
}

impl InferenceEngine {
    /// Wraps `backend`. All calls go through one lock when `serialize` is
    /// set or the backend does not support concurrent calls.
    pub fn new(backend: Box<dyn InferenceBackend>, serialize: bool) -> Self {
        let gate = (serialize || !backend.supports_concurrent_calls()).then(|| Mutex::new(()));
        Self { backend, gate }
    }

    /// Builds the backend selected by `config.kind`.
    pub fn load(config: &BackendConfig, serialize: bool) -> CoreResult<Self> {
        log::info!("Loading {} backend", config.kind);
        let backend: Box<dyn InferenceBackend> = match config.kind {
            BackendKind::Classify => Box::new(TractClassifier::load(config)?),
            BackendKind::Detect => Box::new(TractDetector::load(config)?),
            BackendKind::TextGeneration => Box::new(HostedTextBackend::load(config)?),
        };
        Ok(Self::new(backend, serialize))
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn input_size(&self) -> Option<u32> {
        self.backend.input_size()
    }

    pub fn is_serialized(&self) -> bool {
        self.gate.is_some()
    }

    /// Runs the backend on one tensor.
    pub fn infer(
        &self,
        tensor: &Tensor,
        context: &FrameContext<'_>,
    ) -> CoreResult<Vec<Prediction>> {
        if let Some(expected) = self.backend.input_size() {
            if tensor.size() != expected {
                return Err(CoreError::Inference(format!(
                    "frame {}: tensor shape {:?} does not match backend input {}x{}x3",
                    context.index,
                    tensor.shape(),
                    expected,
                    expected
                )));
            }
        }

        let raw = match &self.gate {
            Some(gate) => {
                let _guard = gate
                    .lock()
                    .map_err(|_| CoreError::Inference("inference lock poisoned".into()))?;
                self.backend.predict(tensor, context)?
            }
            None => self.backend.predict(tensor, context)?,
        };

        Ok(sanitize(raw, context.index))
    }
}

/// Drops predictions with a blank label or a confidence that is not a
/// finite value in `[0, 1]`.
fn sanitize(predictions: Vec<Prediction>, frame: usize) -> Vec<Prediction> {
    let before = predictions.len();
    let kept: Vec<Prediction> = predictions
        .into_iter()
        .filter(|p| {
            !p.label.trim().is_empty()
                && p.confidence.is_finite()
                && (0.0..=1.0).contains(&p.confidence)
        })
        .collect();
    if kept.len() != before {
        log::warn!(
            "Frame {}: dropped {} prediction(s) with invalid label or confidence",
            frame,
            before - kept.len()
        );
    }
    kept
}

/// Loads the engine at most once and hands out shared handles.
///
/// Concurrent callers of [`EngineLoader::get_or_load`] block until the first
/// load finishes. A failed load is not cached, so the next call retries.
#[derive(Default)]
pub struct EngineLoader {
    cell: OnceCell<Arc<InferenceEngine>>,
}

impl EngineLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(
        &self,
        config: &BackendConfig,
        serialize: bool,
    ) -> CoreResult<Arc<InferenceEngine>> {
        self.get_or_init_with(|| InferenceEngine::load(config, serialize))
    }

    /// Same as [`EngineLoader::get_or_load`] with a custom constructor.
    pub fn get_or_init_with<F>(&self, init: F) -> CoreResult<Arc<InferenceEngine>>
    where
        F: FnOnce() -> CoreResult<InferenceEngine>,
    {
        self.cell
            .get_or_try_init(|| init().map(Arc::new))
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}
