//! Cascade face locator backed by `rustface` (SeetaFace funnel-structured cascade).

// Allow common image code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use image::GrayImage;
use tracing::{debug, trace};

use crate::domain::{FaceRegion, InferenceError};
use crate::ports::FaceLocator;

/// Detection settings for the cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeConfig {
    /// Size ratio between consecutive pyramid levels (must be > 1).
    pub scale_factor: f32,
    /// Smallest face to look for, in pixels (at least 20).
    pub min_face_size: u32,
    /// Minimum cascade score for a window to count as a face.
    pub score_threshold: f64,
    /// Sliding-window step in pixels, both axes.
    pub window_step: u32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.3,
            min_face_size: 20,
            score_threshold: 2.0,
            window_step: 4,
        }
    }
}

impl CascadeConfig {
    /// Checks that every setting is one the detector accepts.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if !(1.01..=100.0).contains(&self.scale_factor) {
            return Err(format!(
                "scale_factor must be in 1.01..=100, got {}",
                self.scale_factor
            ));
        }
        if self.min_face_size < 20 {
            return Err(format!(
                "min_face_size must be at least 20, got {}",
                self.min_face_size
            ));
        }
        if self.score_threshold <= 0.0 || self.score_threshold.is_nan() {
            return Err(format!(
                "score_threshold must be positive, got {}",
                self.score_threshold
            ));
        }
        if self.window_step == 0 {
            return Err("window_step must be positive".to_string());
        }
        Ok(())
    }
}

/// Face locator using a SeetaFace cascade model.
///
/// The model is immutable and shared. Each call builds its own detector,
/// so `locate` is safe to call from several threads at once.
pub struct CascadeFaceLocator {
    model: rustface::Model,
    config: CascadeConfig,
}

impl CascadeFaceLocator {
    /// Loads the cascade model from a file.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::ArtifactLoad`] if the file cannot be read or
    /// parsed, or if `config` is invalid.
    pub fn load(path: impl AsRef<Path>, config: CascadeConfig) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        debug!("Loading face cascade from {}", path.display());
        let file = File::open(path).map_err(|e| InferenceError::artifact(path, e))?;
        Self::from_reader(BufReader::new(file), config).map_err(|e| match e {
            InferenceError::ArtifactLoad { reason, .. } => InferenceError::artifact(path, reason),
            other => other,
        })
    }

    /// Reads the cascade model from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::ArtifactLoad`] if the model is malformed or
    /// `config` is invalid.
    pub fn from_reader(reader: impl Read, config: CascadeConfig) -> Result<Self, InferenceError> {
        config
            .validate()
            .map_err(|e| InferenceError::artifact("<cascade config>", e))?;
        let model =
            rustface::read_model(reader).map_err(|e| InferenceError::artifact("<reader>", e))?;
        Ok(Self { model, config })
    }
}

impl FaceLocator for CascadeFaceLocator {
    fn locate(&self, image: &GrayImage) -> Vec<FaceRegion> {
        let (width, height) = image.dimensions();
        if width.min(height) < self.config.min_face_size {
            trace!("Image {width}x{height} is smaller than the minimum face size");
            return Vec::new();
        }

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.config.min_face_size);
        detector.set_score_thresh(self.config.score_threshold);
        detector.set_pyramid_scale_factor(1.0 / self.config.scale_factor);
        detector.set_slide_window_step(self.config.window_step, self.config.window_step);

        let faces = detector.detect(&rustface::ImageData::new(image.as_raw(), width, height));

        let candidates = faces
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                clamp_to_image(
                    i64::from(bbox.x()),
                    i64::from(bbox.y()),
                    i64::from(bbox.width()),
                    i64::from(bbox.height()),
                    width,
                    height,
                )
                .map(|region| (face.score(), region))
            })
            .collect();

        let regions = order_candidates(candidates);
        debug!("Located {} face(s) in {width}x{height} image", regions.len());
        regions
    }
}

/// Intersects a detector box with the image, dropping boxes that end up empty.
pub(crate) fn clamp_to_image(
    x: i64,
    y: i64,
    w: i64,
    h: i64,
    width: u32,
    height: u32,
) -> Option<FaceRegion> {
    let x0 = x.clamp(0, i64::from(width));
    let y0 = y.clamp(0, i64::from(height));
    let x1 = (x + w).clamp(0, i64::from(width));
    let y1 = (y + h).clamp(0, i64::from(height));

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(FaceRegion::new(
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    ))
}

/// Sorts by descending score, then top-to-bottom, left-to-right.
pub(crate) fn order_candidates(mut candidates: Vec<(f64, FaceRegion)>) -> Vec<FaceRegion> {
    candidates.sort_by(|(sa, ra), (sb, rb)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then(ra.y.cmp(&rb.y))
            .then(ra.x.cmp(&rb.x))
    });
    candidates.into_iter().map(|(_, region)| region).collect()
}
