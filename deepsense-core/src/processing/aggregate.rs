// ============================================================================
// deepsense-core/src/processing/aggregate.rs
// ============================================================================
//
// AGGREGATION: Merging Per-Frame Predictions
//
// Predictions from every analyzed frame are concatenated in frame order and
// grouped by label. Each label keeps:
// - the number of predictions carrying it;
// - one representative confidence, chosen by a RepresentativeConfidence
//   policy (first occurrence in frame order unless configured otherwise).
//
// The summary sentence is derived from the grouped objects alone, so two
// equal object lists always produce the same summary.

use serde::{Deserialize, Serialize};

use crate::inference::Prediction;

/// Summary used when no prediction survived the run.
pub const NO_OBJECTS_SUMMARY: &str = "No objects detected in video";

/// How the confidence reported for a label is chosen among its predictions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepresentativeConfidence {
    /// Confidence of the earliest prediction in frame order
    #[default]
    FirstOccurrence,
    /// Highest confidence seen for the label
    Maximum,
}

/// One distinct label found in the video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedObject {
    pub name: String,
    pub count: usize,
    /// Integer percent, 0 to 100
    pub confidence: u8,
}

/// Outcome of the analysis of one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "detectedObjects")]
    pub detected_objects: Vec<AggregatedObject>,
    pub summary: String,
}

impl AnalysisResult {
    /// Result of a run that produced no predictions.
    pub fn empty() -> Self {
        Self {
            detected_objects: Vec::new(),
            summary: NO_OBJECTS_SUMMARY.to_string(),
        }
    }
}

/// Converts a `[0, 1]` confidence to a rounded, clamped percentage.
pub fn confidence_percent(confidence: f32) -> u8 {
    if !confidence.is_finite() {
        return 0;
    }
    (f64::from(confidence) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Groups `predictions` (in frame order) by label.
///
/// Objects are listed in order of first appearance.
pub fn aggregate(predictions: &[Prediction], policy: RepresentativeConfidence) -> AnalysisResult {
    let mut groups: Vec<(&str, usize, f32)> = Vec::new();

    for prediction in predictions {
        match groups
            .iter_mut()
            .find(|(label, _, _)| *label == prediction.label)
        {
            Some((_, count, representative)) => {
                *count += 1;
                if policy == RepresentativeConfidence::Maximum
                    && prediction.confidence > *representative
                {
                    *representative = prediction.confidence;
                }
            }
            None => groups.push((&prediction.label, 1, prediction.confidence)),
        }
    }

    let detected_objects: Vec<AggregatedObject> = groups
        .into_iter()
        .map(|(name, count, confidence)| AggregatedObject {
            name: name.to_string(),
            count,
            confidence: confidence_percent(confidence),
        })
        .collect();

    let summary = build_summary(&detected_objects);
    AnalysisResult {
        detected_objects,
        summary,
    }
}

/// `"Video contains 2 cat(s), 1 dog(s)"`, or the empty sentinel.
pub fn build_summary(objects: &[AggregatedObject]) -> String {
    if objects.is_empty() {
        return NO_OBJECTS_SUMMARY.to_string();
    }
    let parts: Vec<String> = objects
        .iter()
        .map(|obj| format!("{} {}(s)", obj.count, obj.name))
        .collect();
    format!("Video contains {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(label: &str, confidence: f32) -> Prediction {
        Prediction::new(label, confidence)
    }

    #[test]
    fn test_confidence_percent_rounding() {
        assert_eq!(confidence_percent(0.875), 88);
        assert_eq!(confidence_percent(0.874), 87);
        assert_eq!(confidence_percent(0.0), 0);
        assert_eq!(confidence_percent(1.0), 100);
        assert_eq!(confidence_percent(1.7), 100);
        assert_eq!(confidence_percent(f32::NAN), 0);
    }

    #[test]
    fn test_maximum_policy() {
        let preds = [p("cat", 0.4), p("cat", 0.9), p("cat", 0.6)];
        let first = aggregate(&preds, RepresentativeConfidence::FirstOccurrence);
        let max = aggregate(&preds, RepresentativeConfidence::Maximum);
        assert_eq!(first.detected_objects[0].confidence, 40);
        assert_eq!(max.detected_objects[0].confidence, 90);
        assert_eq!(max.detected_objects[0].count, 3);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(build_summary(&[]), NO_OBJECTS_SUMMARY);
        assert_eq!(aggregate(&[], RepresentativeConfidence::default()), AnalysisResult::empty());
    }

    #[test]
    fn test_policy_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&RepresentativeConfidence::FirstOccurrence).unwrap(),
            "\"first-occurrence\""
        );
    }
}
