//! Test support utilities for moodscan.
//!
//! Provides mocks for the core ports, synthetic image builders, and a
//! builder for small emotion classifier artifacts.
//!
//! # Example
//!
//! ```
//! use moodscan_core::{EmotionPipeline, FaceSelection, LabelSet};
//! use moodscan_test_support::{MockClassifier, MockFaceLocator, SyntheticImageBuilder};
//!
//! let pipeline = EmotionPipeline::new(
//!     Box::new(MockFaceLocator::whole_image()),
//!     Box::new(MockClassifier::favoring(LabelSet::default(), 4, 0.9)),
//!     FaceSelection::First,
//! );
//! let image = SyntheticImageBuilder::uniform_gray(64, 64, 128);
//! let result = pipeline.infer_image(&image).unwrap();
//! assert_eq!(result.detection.as_str(), "happy");
//! ```

mod builders;
mod mocks;

pub use builders::{ArtifactBuilder, SyntheticImageBuilder};
pub use mocks::{
    MockClassifier, MockFaceLocator, MockImageSource, MockResultOutput, MockTextGenerator,
    WholeImageLocator,
};
