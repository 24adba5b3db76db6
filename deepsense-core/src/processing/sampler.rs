// ============================================================================
// deepsense-core/src/processing/sampler.rs
// ============================================================================
//
// FRAME SAMPLER: Bounded, Evenly Spaced Frame Selection
//
// Turns a video reference into at most N frames taken at evenly spaced
// timestamps. Decoding is delegated to a `FrameDecoder`; the sampler then
// loads the images the decoder left in the run's scratch directory.
//
// KEY COMPONENTS:
// - sample_timestamps: the spacing rule d * i / (N + 1), i = 1..=N
// - FrameSampler: drives the decoder and loads the written frames
//
// A frame file that is missing or cannot be decoded is skipped with a
// warning. Only a source-level failure (DecodeError) aborts the run.

use std::path::Path;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::external::{ExtractionRequest, FrameDecoder};
use crate::temp_files::frame_path;

use super::types::{Frame, VideoReference};

/// Timestamps of `count` frames evenly spaced over `duration_secs`.
///
/// Frame `i` is placed at `d * i / (count + 1)`, so the very first and last
/// instants of the video are never used. A zero, negative or non-finite
/// duration yields no timestamps.
pub fn sample_timestamps(duration_secs: f64, count: usize) -> Vec<f64> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 || count == 0 {
        return Vec::new();
    }
    let slots = (count + 1) as f64;
    (1..=count)
        .map(|i| duration_secs * i as f64 / slots)
        .collect()
}

/// Samples frames from a video through a `FrameDecoder`.
#[derive(Clone)]
pub struct FrameSampler {
    decoder: Arc<dyn FrameDecoder>,
    count: usize,
    width: u32,
}

impl FrameSampler {
    pub fn new(decoder: Arc<dyn FrameDecoder>, count: usize, width: u32) -> Self {
        Self {
            decoder,
            count,
            width,
        }
    }

    /// Extracts and loads up to `count` frames into memory, in sampling order.
    ///
    /// The returned frames keep the 1-based index of the timestamp they were
    /// taken at, so gaps show which frames were skipped.
    pub fn sample(&self, reference: &VideoReference, scratch_dir: &Path) -> CoreResult<Vec<Frame>> {
        let request = ExtractionRequest {
            count: self.count,
            width: self.width,
        };
        let report = self.decoder.extract_frames(reference, &request, scratch_dir)?;

        let mut frames = Vec::with_capacity(report.timestamps.len());
        for (position, &timestamp_secs) in report.timestamps.iter().take(self.count).enumerate() {
            let index = position + 1;
            let path = frame_path(scratch_dir, index);
            if !path.exists() {
                log::warn!("Frame {} of {} was not produced; skipping", index, reference);
                continue;
            }

            match image::open(&path) {
                Ok(img) => {
                    let rgb = img.to_rgb8();
                    let (width, height) = rgb.dimensions();
                    frames.push(Frame {
                        index,
                        timestamp_secs,
                        width,
                        height,
                        pixels: rgb.into_raw(),
                    });
                }
                Err(e) => {
                    log::warn!(
                        "Frame {} of {} could not be decoded ({}); skipping",
                        index,
                        reference,
                        e
                    );
                }
            }
        }

        log::debug!(
            "Sampled {}/{} frames from {} (duration {:.2}s)",
            frames.len(),
            self.count,
            reference,
            report.duration_secs
        );
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_are_evenly_spaced() {
        let ts = sample_timestamps(60.0, 5);
        assert_eq!(ts, vec![10.0, 20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn test_timestamps_strictly_increase_within_duration() {
        for (duration, count) in [(0.5, 5), (7.3, 1), (3600.0, 12), (1.0, 40)] {
            let ts = sample_timestamps(duration, count);
            assert_eq!(ts.len(), count);
            assert!(ts.windows(2).all(|w| w[0] < w[1]));
            assert!(ts.iter().all(|&t| t > 0.0 && t < duration));
        }
    }

    #[test]
    fn test_degenerate_durations_yield_no_timestamps() {
        assert!(sample_timestamps(0.0, 5).is_empty());
        assert!(sample_timestamps(-3.0, 5).is_empty());
        assert!(sample_timestamps(f64::NAN, 5).is_empty());
        assert!(sample_timestamps(10.0, 0).is_empty());
    }
}
