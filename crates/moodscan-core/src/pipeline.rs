//! The emotion inference pipeline.
//!
//! decode -> locate faces -> pick one -> normalize -> classify -> argmax.

use std::path::PathBuf;

use image::GrayImage;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::{Detection, FaceRegion, InferenceError, InferenceResult, LabelSet};
use crate::inference::{
    argmax, select_device, CascadeConfig, CascadeFaceLocator, CnnEmotionClassifier,
    DevicePreference,
};
use crate::ports::{EmotionClassifier, FaceLocator};
use crate::preprocess::{decode_grayscale, normalize};

/// Which face to classify when the locator finds several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceSelection {
    /// The first region in locator order.
    #[default]
    First,
    /// The region with the largest area. Equal areas keep locator order.
    Largest,
}

impl FaceSelection {
    /// Picks a region, or `None` if there are none.
    #[must_use]
    pub fn select(self, regions: &[FaceRegion]) -> Option<FaceRegion> {
        match self {
            Self::First => regions.first().copied(),
            Self::Largest => regions
                .iter()
                .copied()
                .reduce(|best, r| if r.area() > best.area() { r } else { best }),
        }
    }
}

impl std::str::FromStr for FaceSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "largest" => Ok(Self::Largest),
            other => Err(format!("unknown face selection '{other}' (expected first or largest)")),
        }
    }
}

/// Everything needed to build a pipeline from files on disk.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// SeetaFace cascade model.
    pub face_model_path: PathBuf,
    /// Emotion classifier safetensors artifact.
    pub classifier_path: PathBuf,
    /// Serving labels, in classifier output order.
    pub labels: LabelSet,
    pub cascade: CascadeConfig,
    pub selection: FaceSelection,
    pub device: DevicePreference,
}

impl PipelineConfig {
    /// Config with default labels and settings for the given model files.
    pub fn new(face_model_path: impl Into<PathBuf>, classifier_path: impl Into<PathBuf>) -> Self {
        Self {
            face_model_path: face_model_path.into(),
            classifier_path: classifier_path.into(),
            labels: LabelSet::default(),
            cascade: CascadeConfig::default(),
            selection: FaceSelection::default(),
            device: DevicePreference::default(),
        }
    }
}

/// Locator, classifier and selection policy wired together.
///
/// Both components are read-only after construction, so a pipeline can be
/// shared between threads behind an `Arc`.
pub struct EmotionPipeline {
    locator: Box<dyn FaceLocator>,
    classifier: Box<dyn EmotionClassifier>,
    selection: FaceSelection,
}

impl EmotionPipeline {
    pub fn new(
        locator: Box<dyn FaceLocator>,
        classifier: Box<dyn EmotionClassifier>,
        selection: FaceSelection,
    ) -> Self {
        Self {
            locator,
            classifier,
            selection,
        }
    }

    /// Loads both models and validates the classifier against the labels.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::ArtifactLoad`] or [`InferenceError::LabelMismatch`]
    /// if either model cannot be used.
    pub fn load(config: &PipelineConfig) -> Result<Self, InferenceError> {
        let locator = CascadeFaceLocator::load(&config.face_model_path, config.cascade.clone())?;
        let device = select_device(config.device);
        let classifier =
            CnnEmotionClassifier::load(&config.classifier_path, config.labels.clone(), &device)?;
        info!(
            "Pipeline ready (labels: [{}], selection: {:?})",
            config.labels, config.selection
        );
        Ok(Self::new(
            Box::new(locator),
            Box::new(classifier),
            config.selection,
        ))
    }

    /// Runs the pipeline on encoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::Decode`] for bytes that are not an image,
    /// or an error from normalization or classification. An image without a
    /// face is not an error.
    pub fn infer(&self, bytes: &[u8]) -> Result<InferenceResult, InferenceError> {
        let image = decode_grayscale(bytes)?;
        self.infer_image(&image)
    }

    /// Runs the pipeline on an already decoded grayscale image.
    ///
    /// # Errors
    ///
    /// See [`EmotionPipeline::infer`].
    pub fn infer_image(&self, image: &GrayImage) -> Result<InferenceResult, InferenceError> {
        let regions = self.locator.locate(image);
        let Some(region) = self.selection.select(&regions) else {
            debug!("No face found");
            return Ok(InferenceResult::no_face());
        };
        debug!("Classifying face {region} ({} found)", regions.len());

        let face = normalize(image, region)?;
        let scores = self.classifier.predict(&face)?;

        let labels = self.classifier.labels();
        let invalid = || InferenceError::InvalidOutput {
            expected: labels.len(),
            found: scores.len(),
        };
        if scores.len() != labels.len() {
            return Err(invalid());
        }
        let (index, confidence) = argmax(&scores).ok_or_else(invalid)?;
        let label = labels.get(index).ok_or_else(invalid)?;

        Ok(InferenceResult {
            detection: Detection::Emotion(label),
            confidence,
            face: Some(region),
        })
    }

    /// Serving labels, in classifier output order.
    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        self.classifier.labels()
    }
}
