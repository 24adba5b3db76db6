//! Frame preprocessing.
//!
//! Converts a decoded frame into the fixed-shape tensor expected by the
//! inference backends: a square `size x size x 3` buffer of `f32` values in
//! `[0, 1]`, laid out row by row with the R, G, B channels innermost.

use image::RgbImage;
use image::imageops::{self, FilterType};

use crate::error::{CoreError, CoreResult};

use super::types::Frame;

/// Square HWC tensor with values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    size: u32,
    data: Vec<f32>,
}

impl Tensor {
    /// Wraps an existing HWC buffer. `data` must hold `size * size * 3` values.
    pub fn from_hwc(size: u32, data: Vec<f32>) -> CoreResult<Self> {
        let expected = (size as usize) * (size as usize) * 3;
        if data.len() != expected {
            return Err(CoreError::Inference(format!(
                "tensor buffer holds {} values, expected {} for {}x{}x3",
                data.len(),
                expected,
                size,
                size
            )));
        }
        Ok(Self { size, data })
    }

    /// Side length of the square input.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// `[height, width, channels]`
    pub fn shape(&self) -> [usize; 3] {
        [self.size as usize, self.size as usize, 3]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Value at row `y`, column `x`, channel `c`.
    pub fn get(&self, y: usize, x: usize, c: usize) -> f32 {
        let side = self.size as usize;
        self.data[(y * side + x) * 3 + c]
    }

    /// The same values in NCHW order (`[1, 3, size, size]`), as most ONNX
    /// vision models expect.
    pub fn to_nchw(&self) -> Vec<f32> {
        let side = self.size as usize;
        let plane = side * side;
        let mut out = vec![0.0f32; plane * 3];
        for (pixel, rgb) in self.data.chunks_exact(3).enumerate() {
            for (c, value) in rgb.iter().enumerate() {
                out[c * plane + pixel] = *value;
            }
        }
        out
    }
}

/// Resizes frames to the backend input size and normalizes them.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    size: u32,
}

impl Preprocessor {
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn input_size(&self) -> u32 {
        self.size
    }

    /// Consumes `frame` and produces its tensor.
    pub fn preprocess(&self, frame: Frame) -> CoreResult<Tensor> {
        let Frame {
            index,
            width,
            height,
            pixels,
            ..
        } = frame;

        if width == 0 || height == 0 {
            return Err(CoreError::Preprocess {
                frame: index,
                reason: format!("empty frame ({width}x{height})"),
            });
        }
        let expected = (width as usize) * (height as usize) * 3;
        if pixels.len() != expected {
            return Err(CoreError::Preprocess {
                frame: index,
                reason: format!(
                    "pixel buffer holds {} bytes, expected {} for {}x{} RGB",
                    pixels.len(),
                    expected,
                    width,
                    height
                ),
            });
        }

        let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| CoreError::Preprocess {
            frame: index,
            reason: "pixel buffer rejected".to_string(),
        })?;

        let resized = if width == self.size && height == self.size {
            image
        } else {
            imageops::resize(&image, self.size, self.size, FilterType::Triangle)
        };

        let data = resized
            .into_raw()
            .into_iter()
            .map(|byte| f32::from(byte) / 255.0)
            .collect();

        Ok(Tensor {
            size: self.size,
            data,
        })
    }
}
