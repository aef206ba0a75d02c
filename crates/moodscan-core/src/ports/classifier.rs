//! Emotion classifier port.

use crate::domain::{InferenceError, LabelSet};
use crate::preprocess::NormalizedFace;

/// Scores a normalized face over a closed label set.
///
/// Implementations hold read-only weights and must be safe to call
/// concurrently from several threads.
pub trait EmotionClassifier: Send + Sync {
    /// Labels in output order.
    fn labels(&self) -> &LabelSet;

    /// Returns one non-negative probability per label, in label order.
    ///
    /// # Errors
    ///
    /// Returns an error if the forward pass fails.
    fn predict(&self, face: &NormalizedFace) -> Result<Vec<f32>, InferenceError>;
}
