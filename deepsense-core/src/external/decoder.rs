// ============================================================================
// deepsense-core/src/external/decoder.rs
// ============================================================================
//
// FRAME DECODER: Video-Decode Collaborator
//
// The sampler never talks to ffmpeg directly. It asks a `FrameDecoder` to
// write up to N still images named `frame-{i}.png` (i = 1..=N) into the run's
// scratch directory, then loads whatever files actually appeared.
//
// Two failure levels are distinguished:
// - the whole source is unusable (unreachable, unsupported, no duration):
//   `CoreError::Decode`, which aborts the run;
// - an individual frame is not produced: logged here, tolerated by the
//   sampler as a missing file.
//
// When ffmpeg fails on every timestamp the source counts as unusable.

use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::processing::sampler::sample_timestamps;
use crate::processing::types::VideoReference;
use crate::temp_files::frame_path;
use crate::utils::format_duration;

use super::ffmpeg_executor::{FfmpegSpawner, SidecarSpawner, extract_frame_at};
use super::ffprobe_executor::{FfprobeProber, MediaProber};

/// What the sampler asks the decoder for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Maximum number of frames to write
    pub count: usize,
    /// Output frame width; height follows the aspect ratio
    pub width: u32,
}

/// What the decoder reports back after writing its frames.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionReport {
    /// Probed duration of the source
    pub duration_secs: f64,
    /// Targeted timestamp of frame `i` at position `i - 1`
    pub timestamps: Vec<f64>,
}

/// The video-decode collaborator.
pub trait FrameDecoder: Send + Sync {
    /// Writes up to `request.count` frames named `frame-{i}.png` into `out_dir`.
    fn extract_frames(
        &self,
        reference: &VideoReference,
        request: &ExtractionRequest,
        out_dir: &Path,
    ) -> CoreResult<ExtractionReport>;
}

/// `FrameDecoder` that probes the source with a `MediaProber` and runs one
/// ffmpeg invocation per timestamp.
pub struct FfmpegFrameDecoder<S: FfmpegSpawner, P: MediaProber> {
    spawner: S,
    prober: P,
}

impl FfmpegFrameDecoder<SidecarSpawner, FfprobeProber> {
    /// Decoder using the real ffmpeg and ffprobe binaries.
    pub fn system() -> Self {
        Self::new(SidecarSpawner, FfprobeProber)
    }
}

impl<S: FfmpegSpawner, P: MediaProber> FfmpegFrameDecoder<S, P> {
    pub fn new(spawner: S, prober: P) -> Self {
        Self { spawner, prober }
    }
}

impl<S, P> FrameDecoder for FfmpegFrameDecoder<S, P>
where
    S: FfmpegSpawner + Send + Sync,
    P: MediaProber,
{
    fn extract_frames(
        &self,
        reference: &VideoReference,
        request: &ExtractionRequest,
        out_dir: &Path,
    ) -> CoreResult<ExtractionReport> {
        let source = reference.as_str();
        let probe = self.prober.probe(source).map_err(|e| match e {
            CoreError::Decode(_) => e,
            other => CoreError::Decode(format!("{source}: {other}")),
        })?;

        log::debug!(
            "Probed {}: duration {} ({:?}x{:?})",
            source,
            format_duration(probe.duration_secs),
            probe.width,
            probe.height
        );

        let timestamps = sample_timestamps(probe.duration_secs, request.count);
        let mut written = 0usize;
        let mut failures: Vec<CoreError> = Vec::new();

        for (position, &timestamp) in timestamps.iter().enumerate() {
            let index = position + 1;
            let output = frame_path(out_dir, index);
            match extract_frame_at(&self.spawner, source, timestamp, request.width, &output) {
                Ok(()) => written += 1,
                // ffmpeg itself is unavailable: no frame can ever be produced
                Err(e @ CoreError::CommandStart(..)) => {
                    return Err(CoreError::Decode(e.to_string()));
                }
                Err(e) => {
                    log::warn!(
                        "Frame {} at {} of {} was not extracted: {}",
                        index,
                        format_duration(timestamp),
                        source,
                        e
                    );
                    failures.push(e);
                }
            }
        }

        // ffmpeg rejected the source on every attempt: the container or codec
        // is unsupported, which is not the same as an empty video.
        if written == 0
            && !failures.is_empty()
            && failures.iter().all(|e| matches!(e, CoreError::CommandFailed(..)))
        {
            let mut reasons: Vec<String> = failures
                .iter()
                .filter_map(|e| match e {
                    CoreError::CommandFailed(_, _, stderr) if !stderr.is_empty() => {
                        Some(stderr.clone())
                    }
                    _ => None,
                })
                .collect();
            reasons.dedup();
            return Err(CoreError::Decode(format!(
                "{}: ffmpeg could not extract any frame ({})",
                source,
                reasons.join("; ")
            )));
        }

        log::debug!("Extracted {}/{} frames from {}", written, timestamps.len(), source);

        Ok(ExtractionReport {
            duration_secs: probe.duration_secs,
            timestamps,
        })
    }
}
