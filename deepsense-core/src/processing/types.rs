//! Data carried between the pipeline stages.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{CoreError, CoreResult};

/// Opaque locator of a remote or local video. Only obtainable through
/// [`VideoReference::parse`], so a value of this type is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoReference(String);

impl VideoReference {
    /// Validates a raw locator. Surrounding whitespace is dropped.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation("videourl is required".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for VideoReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// One decoded still image taken from the video.
///
/// Frames are handed to the preprocessor by value, so each is turned into a
/// tensor at most once and its pixel buffer is released right after.
#[derive(Clone, PartialEq)]
pub struct Frame {
    /// 1-based position in the sampling order
    pub index: usize,
    /// Timestamp the frame was taken at
    pub timestamp_secs: f64,
    pub width: u32,
    pub height: u32,
    /// Packed RGB bytes, row-major, `width * height * 3` long
    pub pixels: Vec<u8>,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("timestamp_secs", &self.timestamp_secs)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &format_args!("[{} bytes]", self.pixels.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_is_trimmed() {
        let reference = VideoReference::parse("  https://cdn.example.com/a.mp4 \n").unwrap();
        assert_eq!(reference.as_str(), "https://cdn.example.com/a.mp4");
        assert_eq!(
            serde_json::to_string(&reference).unwrap(),
            "\"https://cdn.example.com/a.mp4\""
        );
    }

    #[test]
    fn test_blank_reference_is_rejected() {
        for raw in ["", "   ", "\t\n"] {
            let err = VideoReference::parse(raw).unwrap_err();
            assert_eq!(err.kind(), "validation");
            assert_eq!(err.to_string(), "videourl is required");
        }
    }
}
