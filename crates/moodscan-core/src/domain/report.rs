//! Per-image input and report types used by batch detection.

use serde::{Deserialize, Serialize};

use super::{FaceRegion, InferenceResult};
use crate::recommend::recommend_detection;

/// Raw encoded image bytes and where they came from.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Path or other identifier of the image.
    pub path: String,
    /// Encoded image data (PNG, JPEG, ...).
    pub bytes: Vec<u8>,
}

impl ImageInput {
    #[must_use]
    pub fn new(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }
}

/// Detection report for a single image, as written by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionReport {
    /// Path to the analyzed image.
    pub path: String,
    /// Timestamp of analysis (ISO 8601).
    pub timestamp: String,
    /// Detected emotion name, or `no_face`.
    pub detected_emotion: String,
    /// Probability of the detected emotion.
    pub confidence: f32,
    /// Classified face region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face: Option<FaceRegion>,
    /// Advisory text for the detected emotion.
    pub recommendation: String,
}

impl EmotionReport {
    /// Assembles a report from a pipeline result.
    #[must_use]
    pub fn from_result(
        path: impl Into<String>,
        timestamp: impl Into<String>,
        result: &InferenceResult,
    ) -> Self {
        Self {
            path: path.into(),
            timestamp: timestamp.into(),
            detected_emotion: result.detection.as_str().to_string(),
            confidence: result.confidence,
            face: result.face,
            recommendation: recommend_detection(result.detection).to_string(),
        }
    }

    /// Whether the report describes a detected face.
    #[must_use]
    pub fn has_face(&self) -> bool {
        self.face.is_some()
    }
}
