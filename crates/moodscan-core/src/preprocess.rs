//! Image decoding and face normalization.
//!
//! A face crop is resized to exactly 48x48 (no aspect preservation, matching
//! training-time preprocessing) and its intensities are scaled to `[0, 1]`.

// Allow common image code patterns
#![allow(clippy::cast_possible_truncation)]

use candle_core::{Device, Tensor};
use image::imageops::{self, FilterType};
use image::GrayImage;
use tracing::trace;

use crate::domain::{FaceRegion, InferenceError};

/// Side length of the classifier input.
pub const FACE_SIZE: usize = 48;

/// Number of channels of the classifier input.
pub const FACE_CHANNELS: usize = 1;

/// Interpolation used when resizing crops (bilinear).
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// A 48x48x1 (height, width, channel) face tensor with values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFace {
    data: Vec<f32>,
}

impl NormalizedFace {
    /// Shape as (height, width, channel).
    pub const SHAPE: [usize; 3] = [FACE_SIZE, FACE_SIZE, FACE_CHANNELS];

    /// Builds a face from raw values.
    ///
    /// Returns `None` unless there are exactly 48*48 values, all within `[0, 1]`.
    #[must_use]
    pub fn from_values(data: Vec<f32>) -> Option<Self> {
        let valid = data.len() == FACE_SIZE * FACE_SIZE * FACE_CHANNELS
            && data.iter().all(|v| (0.0..=1.0).contains(v));
        valid.then_some(Self { data })
    }

    /// Values in row-major (height, width, channel) order.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.data
    }

    /// Value at pixel `(x, y)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= FACE_SIZE || y >= FACE_SIZE {
            return None;
        }
        self.data.get(y * FACE_SIZE + x).copied()
    }

    /// Converts to an NCHW tensor of shape `(1, 1, 48, 48)`.
    ///
    /// With a single channel, HWC and CHW share the same memory layout.
    ///
    /// # Errors
    ///
    /// Returns an error if tensor creation fails.
    pub fn to_tensor(&self, device: &Device) -> Result<Tensor, InferenceError> {
        Ok(Tensor::from_slice(
            &self.data,
            (1, FACE_CHANNELS, FACE_SIZE, FACE_SIZE),
            device,
        )?)
    }
}

/// Decodes encoded image bytes into a single-channel 8-bit image.
///
/// # Errors
///
/// Returns [`InferenceError::Decode`] if the bytes are not a supported image.
pub fn decode_grayscale(bytes: &[u8]) -> Result<GrayImage, InferenceError> {
    let image = image::load_from_memory(bytes)?;
    trace!("Decoded {}x{} image", image.width(), image.height());
    Ok(image.to_luma8())
}

/// Crops `region` out of `image` and normalizes it for the classifier.
///
/// # Errors
///
/// Returns [`InferenceError::InvalidRegion`] if the region is empty or
/// extends past the image bounds.
pub fn normalize(image: &GrayImage, region: FaceRegion) -> Result<NormalizedFace, InferenceError> {
    let (width, height) = image.dimensions();
    if !region.fits_within(width, height) {
        return Err(InferenceError::InvalidRegion {
            region,
            width,
            height,
        });
    }

    let crop = imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image();
    let resized = imageops::resize(&crop, FACE_SIZE as u32, FACE_SIZE as u32, RESIZE_FILTER);

    let data = resized.pixels().map(|p| f32::from(p[0]) / 255.0).collect();
    Ok(NormalizedFace { data })
}
