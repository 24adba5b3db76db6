//! YOLO-style object detector running a local ONNX model through tract.
//!
//! Expected output layout is `[1, boxes, 5 + classes]`, each row holding
//! `cx, cy, w, h` in input pixels, the objectness score, then one score per
//! class. A box is kept when `objectness * best class score` reaches the
//! confidence threshold; overlapping boxes of the same class are then
//! suppressed.

use crate::config::BackendConfig;
use crate::error::{CoreError, CoreResult};
use crate::processing::preprocess::Tensor;

use super::classifier::{RunnableModel, load_runnable, run_model};
use super::{
    BackendKind, BoundingBox, FrameContext, InferenceBackend, Prediction, label_for, load_labels,
};

/// A candidate box before labels are attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub score: f32,
    pub bbox: BoundingBox,
}

pub struct TractDetector {
    model: RunnableModel,
    labels: Vec<String>,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl TractDetector {
    pub fn load(config: &BackendConfig) -> CoreResult<Self> {
        let model_path = config
            .model_path
            .as_deref()
            .ok_or_else(|| CoreError::Config("detector requires backend.model_path".into()))?;
        let labels = match config.labels_path.as_deref() {
            Some(path) => load_labels(path)?,
            None => Vec::new(),
        };
        let model = load_runnable(model_path, config.input_size)?;
        log::info!(
            "Loaded detector {} ({} labels, input {}x{})",
            model_path.display(),
            labels.len(),
            config.input_size,
            config.input_size
        );

        Ok(Self {
            model,
            labels,
            input_size: config.input_size,
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
        })
    }
}

/// Decodes raw YOLO rows (`row_len = 5 + classes`) into scored boxes
/// normalized to the input square.
pub fn decode_rows(
    rows: &[f32],
    row_len: usize,
    input_size: u32,
    confidence_threshold: f32,
) -> Vec<Detection> {
    if row_len <= 5 {
        return Vec::new();
    }
    let side = input_size as f32;

    rows.chunks_exact(row_len)
        .filter_map(|row| {
            let objectness = row[4];
            let (class_id, class_score) = row[5..]
                .iter()
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(&b.1))?;
            let score = objectness * class_score;
            if !score.is_finite() || score < confidence_threshold {
                return None;
            }

            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            let clamp = |v: f32| (v / side).clamp(0.0, 1.0);
            Some(Detection {
                class_id,
                score,
                bbox: BoundingBox {
                    x_min: clamp(cx - w / 2.0),
                    y_min: clamp(cy - h / 2.0),
                    x_max: clamp(cx + w / 2.0),
                    y_max: clamp(cy + h / 2.0),
                },
            })
        })
        .collect()
}

/// Greedy per-class non-maximum suppression. Survivors are ordered by
/// descending score.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

impl InferenceBackend for TractDetector {
    fn kind(&self) -> BackendKind {
        BackendKind::Detect
    }

    fn input_size(&self) -> Option<u32> {
        Some(self.input_size)
    }

    fn predict(&self, tensor: &Tensor, context: &FrameContext<'_>) -> CoreResult<Vec<Prediction>> {
        let (shape, values) = run_model(&self.model, tensor)?;
        let row_len = match shape.as_slice() {
            [1, _, row_len] if *row_len > 5 => *row_len,
            other => {
                return Err(CoreError::Inference(format!(
                    "detector output {other:?} is not [1, boxes, 5 + classes]"
                )));
            }
        };

        let candidates = decode_rows(&values, row_len, self.input_size, self.confidence_threshold);
        let candidate_count = candidates.len();
        let kept = non_max_suppression(candidates, self.iou_threshold);
        log::debug!(
            "Frame {}: {} boxes above threshold, {} after NMS",
            context.index,
            candidate_count,
            kept.len()
        );

        Ok(kept
            .into_iter()
            .map(|d| {
                Prediction::new(label_for(&self.labels, d.class_id), d.score).with_bbox(d.bbox)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rows_scores_and_normalizes() {
        // two classes; row_len = 7
        let rows = vec![
            50.0, 50.0, 20.0, 40.0, 0.9, 0.1, 0.8, // class 1, score 0.72
            10.0, 10.0, 4.0, 4.0, 0.2, 0.9, 0.1, // score 0.18, dropped
        ];
        let detections = decode_rows(&rows, 7, 100, 0.25);
        assert_eq!(detections.len(), 1);
        let d = detections[0];
        assert_eq!(d.class_id, 1);
        assert!((d.score - 0.72).abs() < 1e-6);
        assert!((d.bbox.x_min - 0.4).abs() < 1e-6);
        assert!((d.bbox.y_min - 0.3).abs() < 1e-6);
        assert!((d.bbox.x_max - 0.6).abs() < 1e-6);
        assert!((d.bbox.y_max - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_is_per_class() {
        let bbox = BoundingBox {
            x_min: 0.1,
            y_min: 0.1,
            x_max: 0.5,
            y_max: 0.5,
        };
        let shifted = BoundingBox {
            x_min: 0.12,
            y_min: 0.1,
            x_max: 0.52,
            y_max: 0.5,
        };
        let detections = vec![
            Detection {
                class_id: 0,
                score: 0.6,
                bbox: shifted,
            },
            Detection {
                class_id: 0,
                score: 0.9,
                bbox,
            },
            Detection {
                class_id: 1,
                score: 0.7,
                bbox,
            },
        ];

        let kept = non_max_suppression(detections, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!((kept[0].class_id, kept[0].score), (0, 0.9));
        assert_eq!((kept[1].class_id, kept[1].score), (1, 0.7));
    }

    #[test]
    fn test_short_rows_yield_nothing() {
        assert!(decode_rows(&[1.0, 2.0, 3.0, 4.0, 5.0], 5, 10, 0.0).is_empty());
    }
}
