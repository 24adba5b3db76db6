//! FFprobe integration for media analysis
//!
//! The frame decoder needs the duration of the source video to space its
//! samples evenly. The `MediaProber` trait hides ffprobe so tests can supply
//! fixed durations or simulate unreachable sources.
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use ffprobe::{FfProbeError, ffprobe};

/// Basic properties of a probed video source.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaProbe {
    /// Duration in seconds
    pub duration_secs: f64,
    /// Width of the first video stream
    pub width: Option<i64>,
    /// Height of the first video stream
    pub height: Option<i64>,
}

/// Something that can inspect a video source before frames are extracted.
pub trait MediaProber: Send + Sync {
    /// Probes `source` (a URL or a local path).
    ///
    /// Returns `CoreError::Decode` when the source has no video stream or no
    /// usable duration.
    fn probe(&self, source: &str) -> CoreResult<MediaProbe>;
}

/// `MediaProber` backed by the `ffprobe` crate.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProber;

impl FfprobeProber {
    pub fn new() -> Self {
        Self
    }
}

impl MediaProber for FfprobeProber {
    fn probe(&self, source: &str) -> CoreResult<MediaProbe> {
        log::debug!("Running ffprobe (via crate) on: {}", source);
        let metadata = ffprobe(source).map_err(|err| {
            log::error!("ffprobe failed for {}: {:?}", source, err);
            map_ffprobe_error(err, "media probe")
        })?;

        let video_stream = metadata
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| CoreError::Decode(format!("No video stream found in {source}")))?;

        let duration_secs = metadata
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| {
                CoreError::Decode(format!("Failed to read duration of {source}"))
            })?;

        Ok(MediaProbe {
            duration_secs,
            width: video_stream.width,
            height: video_stream.height,
        })
    }
}

fn map_ffprobe_error(err: FfProbeError, context: &str) -> CoreError {
    match err {
        FfProbeError::Io(io_err) => command_start_error(format!("ffprobe ({context})"), io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(format!("ffprobe ({context})"), output.status, stderr)
        }
        FfProbeError::Deserialize(err) => CoreError::Decode(format!(
            "ffprobe {context} output deserialization: {err}"
        )),
        _ => CoreError::Decode(format!("Unknown ffprobe error during {context}: {err:?}")),
    }
}
