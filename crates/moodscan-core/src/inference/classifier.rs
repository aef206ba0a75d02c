//! Emotion classifier CNN.
//!
//! A small convolutional network over 48x48 grayscale faces, trained offline
//! on eight emotion classes and loaded here for inference only.

use std::path::Path;

use candle_core::{Device, Module, ModuleT, Tensor};
use candle_nn::{batch_norm, conv2d, linear, BatchNorm, BatchNormConfig, Conv2d, Conv2dConfig, Linear, VarBuilder};
use tracing::{info, warn};

use super::loader::load_artifact;
use crate::domain::{InferenceError, LabelSet};
use crate::ports::EmotionClassifier;
use crate::preprocess::{NormalizedFace, FACE_SIZE};

/// Flattened feature size after the convolutional stack.
///
/// 48 -> conv 46 -> pool 23 -> conv 21 -> pool 10 -> conv 8 -> pool 4,
/// so 128 channels * 4 * 4.
const FLAT_FEATURES: usize = 128 * 4 * 4;

/// Epsilon of the batch-norm layers, as trained.
const BATCH_NORM_EPS: f64 = 1e-3;

/// The network: three conv blocks, two hidden dense layers, softmax head.
///
/// Dense layers are followed by ReLU then batch-norm, which always runs with
/// its running statistics. Dropout from training is omitted.
struct EmotionCnn {
    conv1: Conv2d,
    conv2: Conv2d,
    conv3: Conv2d,
    fc1: Linear,
    bn1: BatchNorm,
    fc2: Linear,
    bn2: BatchNorm,
    fc3: Linear,
}

impl EmotionCnn {
    #[allow(clippy::needless_pass_by_value)]
    fn new(vb: VarBuilder, num_labels: usize) -> candle_core::Result<Self> {
        let conv = Conv2dConfig::default();
        let bn = BatchNormConfig {
            eps: BATCH_NORM_EPS,
            ..BatchNormConfig::default()
        };

        Ok(Self {
            conv1: conv2d(1, 32, 3, conv, vb.pp("conv1"))?,
            conv2: conv2d(32, 64, 3, conv, vb.pp("conv2"))?,
            conv3: conv2d(64, 128, 3, conv, vb.pp("conv3"))?,
            fc1: linear(FLAT_FEATURES, 256, vb.pp("fc1"))?,
            bn1: batch_norm(256, bn, vb.pp("bn1"))?,
            fc2: linear(256, 128, vb.pp("fc2"))?,
            bn2: batch_norm(128, bn, vb.pp("bn2"))?,
            fc3: linear(128, num_labels, vb.pp("fc3"))?,
        })
    }
}

impl Module for EmotionCnn {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let x = self.conv1.forward(x)?.relu()?.max_pool2d(2)?;
        let x = self.conv2.forward(&x)?.relu()?.max_pool2d(2)?;
        let x = self.conv3.forward(&x)?.relu()?.max_pool2d(2)?;

        let x = x.flatten_from(1)?;

        let x = self.fc1.forward(&x)?.relu()?;
        let x = self.bn1.forward_t(&x, false)?;
        let x = self.fc2.forward(&x)?.relu()?;
        let x = self.bn2.forward_t(&x, false)?;

        let logits = self.fc3.forward(&x)?;
        candle_nn::ops::softmax(&logits, 1)
    }
}

/// Emotion classifier backed by a candle CNN.
///
/// Weights are immutable after loading, so one instance can serve
/// concurrent requests without locking.
pub struct CnnEmotionClassifier {
    model: EmotionCnn,
    labels: LabelSet,
    device: Device,
}

impl std::fmt::Debug for CnnEmotionClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CnnEmotionClassifier")
            .field("labels", &self.labels)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl CnnEmotionClassifier {
    /// Builds the classifier from weights, with one output per label.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor is missing or has the wrong shape.
    pub fn new(vb: VarBuilder, labels: LabelSet) -> Result<Self, InferenceError> {
        let device = vb.device().clone();
        let model = EmotionCnn::new(vb, labels.len())?;
        Ok(Self {
            model,
            labels,
            device,
        })
    }

    /// Loads a safetensors artifact and checks it against the serving labels.
    ///
    /// If the artifact declares its training labels they must match `labels`
    /// exactly, in length and order. The output layer must also have one
    /// unit per label.
    ///
    /// # Errors
    ///
    /// - [`InferenceError::ArtifactLoad`] if the file is missing, corrupt or has wrong shapes
    /// - [`InferenceError::LabelMismatch`] if the declared labels differ from `labels`
    pub fn load(
        path: impl AsRef<Path>,
        labels: LabelSet,
        device: &Device,
    ) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let artifact = load_artifact(path, device)?;

        match &artifact.labels {
            Some(declared) => check_labels(&labels, declared)?,
            None => warn!(
                "{} declares no labels; assuming [{labels}]",
                path.display()
            ),
        }

        let classifier = Self::new(artifact.vb, labels)
            .map_err(|e| InferenceError::artifact(path, e))?;
        info!(
            "Loaded emotion classifier from {} ({} labels)",
            path.display(),
            classifier.labels.len()
        );
        Ok(classifier)
    }

    /// Device the weights live on.
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }
}

impl EmotionClassifier for CnnEmotionClassifier {
    fn labels(&self) -> &LabelSet {
        &self.labels
    }

    fn predict(&self, face: &NormalizedFace) -> Result<Vec<f32>, InferenceError> {
        let input = face.to_tensor(&self.device)?;
        let probs = self.model.forward(&input)?;
        let probs = probs.squeeze(0)?.to_vec1::<f32>()?;
        Ok(probs)
    }
}

/// Fails unless `declared` names the same labels as `expected`, in the same order.
fn check_labels(expected: &LabelSet, declared: &[String]) -> Result<(), InferenceError> {
    let mismatch = || InferenceError::LabelMismatch {
        expected: expected.to_string(),
        found: declared.join(","),
    };

    if declared.len() != expected.len() {
        return Err(mismatch());
    }
    let declared = LabelSet::parse(declared).map_err(|_| mismatch())?;
    if &declared != expected {
        return Err(mismatch());
    }
    Ok(())
}

// Compile-time check that the pooled size matches the flattened width.
const _: () = assert!((((FACE_SIZE - 2) / 2 - 2) / 2 - 2) / 2 == 4);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use candle_core::DType;

    fn zero_classifier(labels: LabelSet) -> CnnEmotionClassifier {
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        CnnEmotionClassifier::new(vb, labels).unwrap()
    }

    #[test]
    fn test_predict_returns_one_probability_per_label() {
        let classifier = zero_classifier(LabelSet::default());
        let face = NormalizedFace::from_values(vec![0.3; 48 * 48]).unwrap();

        let probs = classifier.predict(&face).unwrap();
        assert_eq!(probs.len(), 8);
        assert!(probs.iter().all(|p| *p >= 0.0));
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_predict_respects_label_count() {
        let labels = LabelSet::parse(&["happy", "sad", "neutral"]).unwrap();
        let classifier = zero_classifier(labels);
        let face = NormalizedFace::from_values(vec![1.0; 48 * 48]).unwrap();
        assert_eq!(classifier.predict(&face).unwrap().len(), 3);
    }

    #[test]
    fn test_predict_is_deterministic() {
        let classifier = zero_classifier(LabelSet::default());
        let face = NormalizedFace::from_values(vec![0.7; 48 * 48]).unwrap();
        let a = classifier.predict(&face).unwrap();
        let b = classifier.predict(&face).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_check_labels_accepts_matching_order() {
        let expected = LabelSet::default();
        let declared: Vec<String> = expected.names().into_iter().map(String::from).collect();
        assert!(check_labels(&expected, &declared).is_ok());
    }

    #[test]
    fn test_check_labels_rejects_serving_set() {
        let declared: Vec<String> = ["happy", "sad", "angry", "neutral", "fearful", "disgust", "surprised"]
            .into_iter()
            .map(String::from)
            .collect();
        let result = check_labels(&LabelSet::default(), &declared);
        assert!(matches!(result, Err(InferenceError::LabelMismatch { .. })));
    }

    #[test]
    fn test_check_labels_rejects_reordering() {
        let mut declared: Vec<String> = LabelSet::default()
            .names()
            .into_iter()
            .map(String::from)
            .collect();
        declared.swap(0, 1);
        let result = check_labels(&LabelSet::default(), &declared);
        assert!(matches!(result, Err(InferenceError::LabelMismatch { .. })));
    }
}
