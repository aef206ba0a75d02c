//! Face regions and inference results.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use super::EmotionLabel;

/// Axis-aligned face rectangle in image pixel coordinates (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FaceRegion {
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in pixels.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the region is non-empty and lies entirely inside a `width` x `height` image.
    #[must_use]
    pub const fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

impl fmt::Display for FaceRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Outcome of running the pipeline on one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// A face was found and classified.
    Emotion(EmotionLabel),
    /// No face was found. A normal result, not an error.
    NoFace,
}

impl Detection {
    /// Name used in JSON output: the label, or `no_face`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Emotion(label) => label.as_str(),
            Self::NoFace => "no_face",
        }
    }

    /// The detected label, if a face was found.
    #[must_use]
    pub const fn label(&self) -> Option<EmotionLabel> {
        match self {
            Self::Emotion(label) => Some(*label),
            Self::NoFace => None,
        }
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Detection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Result of a single inference call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResult {
    /// Detected emotion, or the no-face sentinel.
    #[serde(rename = "detected_emotion")]
    pub detection: Detection,
    /// Probability of the selected label, in `[0, 1]`. Zero when no face was found.
    pub confidence: f32,
    /// The face region that was classified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face: Option<FaceRegion>,
}

impl InferenceResult {
    /// The sentinel result for images without a detectable face.
    #[must_use]
    pub const fn no_face() -> Self {
        Self {
            detection: Detection::NoFace,
            confidence: 0.0,
            face: None,
        }
    }

    /// Whether a face was found.
    #[must_use]
    pub const fn has_face(&self) -> bool {
        matches!(self.detection, Detection::Emotion(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_region_fits_within() {
        let region = FaceRegion::new(10, 10, 20, 20);
        assert!(region.fits_within(30, 30));
        assert!(!region.fits_within(29, 30));
        assert!(!FaceRegion::new(0, 0, 0, 5).fits_within(10, 10));
    }

    #[test]
    fn test_region_fits_within_does_not_overflow() {
        let region = FaceRegion::new(u32::MAX, 0, 1, 1);
        assert!(!region.fits_within(u32::MAX, 1));
    }

    #[test]
    fn test_no_face_serializes_sentinel() {
        let json = serde_json::to_value(InferenceResult::no_face()).unwrap();
        assert_eq!(json["detected_emotion"], "no_face");
        assert_eq!(json["confidence"], 0.0);
        assert!(json.get("face").is_none());
    }

    #[test]
    fn test_emotion_result_serializes_label() {
        let result = InferenceResult {
            detection: Detection::Emotion(EmotionLabel::Happy),
            confidence: 0.5,
            face: Some(FaceRegion::new(1, 2, 3, 4)),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["detected_emotion"], "happy");
        assert_eq!(json["face"]["width"], 3);
        assert!(result.has_face());
    }
}
