//! Error taxonomy for the inference pipeline.
//!
//! "No face detected" is not an error: it is [`crate::Detection::NoFace`].

use std::path::PathBuf;

use thiserror::Error;

use super::FaceRegion;

/// Errors raised while loading artifacts or running inference.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The input bytes are not a decodable image.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// A face region does not fit inside the image it was taken from.
    #[error("face region {region} lies outside the {width}x{height} image")]
    InvalidRegion {
        region: FaceRegion,
        width: u32,
        height: u32,
    },

    /// A model file is missing, unreadable or malformed.
    #[error("failed to load artifact {}: {reason}", path.display())]
    ArtifactLoad { path: PathBuf, reason: String },

    /// The serving label order differs from the one the artifact was trained with.
    #[error("label mismatch: configured [{expected}] but artifact was trained on [{found}]")]
    LabelMismatch { expected: String, found: String },

    /// The configured label list itself is unusable.
    #[error("invalid label set: {0}")]
    InvalidLabels(String),

    /// The classifier produced scores that cannot be mapped to a label.
    #[error("classifier returned {found} scores for {expected} labels")]
    InvalidOutput { expected: usize, found: usize },

    /// The tensor runtime failed during a forward pass.
    #[error("model inference failed: {0}")]
    Model(#[from] candle_core::Error),
}

impl InferenceError {
    /// Builds an [`InferenceError::ArtifactLoad`] for `path`.
    pub fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
