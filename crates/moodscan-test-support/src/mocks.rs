//! Mock implementations of core port traits.

use std::sync::{Arc, Mutex, PoisonError};

use image::GrayImage;
use moodscan_core::chat::ChatError;
use moodscan_core::domain::{EmotionReport, FaceRegion, ImageInput, InferenceError, LabelSet};
use moodscan_core::ports::{
    EmotionClassifier, FaceLocator, ImageSource, ResultOutput, TextGenerator,
};
use moodscan_core::preprocess::NormalizedFace;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock implementation of `FaceLocator`.
///
/// Returns the same regions for every image and counts calls.
pub struct MockFaceLocator {
    regions: Vec<FaceRegion>,
    calls: Arc<Mutex<usize>>,
}

impl MockFaceLocator {
    /// A locator that always reports `regions`, in that order.
    #[must_use]
    pub fn new(regions: Vec<FaceRegion>) -> Self {
        Self {
            regions,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// A locator that never finds a face.
    #[must_use]
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    /// A locator that reports one face covering the whole image.
    ///
    /// The region is computed per image, so this works for any size.
    #[must_use]
    pub fn whole_image() -> WholeImageLocator {
        WholeImageLocator
    }

    /// Number of `locate` calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *lock(&self.calls)
    }
}

impl FaceLocator for MockFaceLocator {
    fn locate(&self, _image: &GrayImage) -> Vec<FaceRegion> {
        *lock(&self.calls) += 1;
        self.regions.clone()
    }
}

/// Locator reporting a single face that spans the whole image.
pub struct WholeImageLocator;

impl FaceLocator for WholeImageLocator {
    fn locate(&self, image: &GrayImage) -> Vec<FaceRegion> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }
        vec![FaceRegion::new(0, 0, width, height)]
    }
}

/// Mock implementation of `EmotionClassifier`.
///
/// Returns fixed scores and records every face it was given. Clones share
/// the recorded inputs.
#[derive(Clone)]
pub struct MockClassifier {
    labels: LabelSet,
    scores: Vec<f32>,
    inputs: Arc<Mutex<Vec<NormalizedFace>>>,
}

impl MockClassifier {
    /// A classifier returning `scores` for every face.
    #[must_use]
    pub fn new(labels: LabelSet, scores: Vec<f32>) -> Self {
        Self {
            labels,
            scores,
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A classifier giving probability `p` to output `index` and sharing the
    /// rest evenly.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn favoring(labels: LabelSet, index: usize, p: f32) -> Self {
        let n = labels.len();
        let rest = if n > 1 { (1.0 - p) / (n - 1) as f32 } else { 0.0 };
        let scores = (0..n).map(|i| if i == index { p } else { rest }).collect();
        Self::new(labels, scores)
    }

    /// Faces passed to `predict`, in call order.
    #[must_use]
    pub fn inputs(&self) -> Vec<NormalizedFace> {
        lock(&self.inputs).clone()
    }
}

impl EmotionClassifier for MockClassifier {
    fn labels(&self) -> &LabelSet {
        &self.labels
    }

    fn predict(&self, face: &NormalizedFace) -> Result<Vec<f32>, InferenceError> {
        lock(&self.inputs).push(face.clone());
        Ok(self.scores.clone())
    }
}

/// Mock implementation of `TextGenerator`.
///
/// Answers with a canned reply and records the prompts it received.
pub struct MockTextGenerator {
    reply: Result<Option<String>, u16>,
    prompts: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockTextGenerator {
    /// Always answers `text`.
    #[must_use]
    pub fn replying(text: &str) -> Self {
        Self::with(Ok(Some(text.to_string())))
    }

    /// Always answers without any text.
    #[must_use]
    pub fn silent() -> Self {
        Self::with(Ok(None))
    }

    /// Always fails with HTTP `status`.
    #[must_use]
    pub fn failing(status: u16) -> Self {
        Self::with(Err(status))
    }

    fn with(reply: Result<Option<String>, u16>) -> Self {
        Self {
            reply,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// `(system, user)` pairs received so far.
    #[must_use]
    pub fn prompts(&self) -> Vec<(String, String)> {
        lock(&self.prompts).clone()
    }
}

impl TextGenerator for MockTextGenerator {
    async fn generate(&self, system: &str, user: &str) -> Result<Option<String>, ChatError> {
        lock(&self.prompts).push((system.to_string(), user.to_string()));
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(ChatError::Status {
                status: *status,
                body: "mock failure".to_string(),
            }),
        }
    }
}

/// Mock implementation of `ImageSource` for testing.
///
/// Yields pre-built inputs, optionally interleaved with read errors.
pub struct MockImageSource {
    items: Vec<Result<ImageInput, String>>,
}

impl MockImageSource {
    /// Creates a new mock source with the given images.
    #[must_use]
    pub fn new(images: Vec<ImageInput>) -> Self {
        Self {
            items: images.into_iter().map(Ok).collect(),
        }
    }

    /// Creates an empty mock source.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Appends an item that fails to load with `message`.
    #[must_use]
    pub fn with_error(mut self, message: &str) -> Self {
        self.items.push(Err(message.to_string()));
        self
    }
}

impl ImageSource for MockImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = anyhow::Result<ImageInput>> + Send + '_> {
        Box::new(self.items.iter().map(|item| match item {
            Ok(input) => Ok(input.clone()),
            Err(message) => Err(anyhow::anyhow!("{message}")),
        }))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Mock implementation of `ResultOutput` for testing.
///
/// Captures reports for later assertions.
pub struct MockResultOutput {
    reports: Arc<Mutex<Vec<EmotionReport>>>,
    flush_count: Arc<Mutex<usize>>,
}

impl MockResultOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reports: Arc::new(Mutex::new(Vec::new())),
            flush_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns all captured reports.
    #[must_use]
    pub fn reports(&self) -> Vec<EmotionReport> {
        lock(&self.reports).clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        *lock(&self.flush_count)
    }
}

impl Default for MockResultOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultOutput for MockResultOutput {
    fn write(&self, report: &EmotionReport) -> anyhow::Result<()> {
        lock(&self.reports).push(report.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        *lock(&self.flush_count) += 1;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_locator_counts_calls() {
        let locator = MockFaceLocator::new(vec![FaceRegion::new(0, 0, 5, 5)]);
        let image = GrayImage::new(10, 10);
        assert_eq!(locator.locate(&image).len(), 1);
        assert_eq!(locator.locate(&image).len(), 1);
        assert_eq!(locator.call_count(), 2);
    }

    #[test]
    fn test_whole_image_locator() {
        let regions = MockFaceLocator::whole_image().locate(&GrayImage::new(30, 20));
        assert_eq!(regions, vec![FaceRegion::new(0, 0, 30, 20)]);
    }

    #[test]
    fn test_favoring_classifier_scores() {
        let classifier = MockClassifier::favoring(LabelSet::default(), 4, 0.65);
        let face = NormalizedFace::from_values(vec![0.0; 48 * 48]).unwrap();
        let scores = classifier.predict(&face).unwrap();
        assert_eq!(scores.len(), 8);
        assert!((scores[4] - 0.65).abs() < 1e-6);
        assert!((scores.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert_eq!(classifier.inputs().len(), 1);
    }

    #[test]
    fn test_mock_image_source_with_error() {
        let source = MockImageSource::new(vec![ImageInput::new("a.png", vec![1, 2, 3])])
            .with_error("unreadable");
        let items: Vec<_> = source.images().collect();
        assert_eq!(source.count_hint(), Some(2));
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[test]
    fn test_mock_result_output() {
        let output = MockResultOutput::new();
        let report = EmotionReport {
            path: "test.png".into(),
            timestamp: "2024-01-01T00:00:00Z".into(),
            detected_emotion: "happy".into(),
            confidence: 0.9,
            face: None,
            recommendation: String::new(),
        };

        output.write(&report).unwrap();
        output.flush().unwrap();

        assert_eq!(output.reports().len(), 1);
        assert_eq!(output.reports()[0].path, "test.png");
        assert_eq!(output.flush_count(), 1);
    }
}
