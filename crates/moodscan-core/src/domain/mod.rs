//! Core domain types for emotion inference.

mod emotion;
mod error;
mod report;
mod result;

pub use emotion::{EmotionLabel, LabelSet, UnknownLabel};
pub use error::InferenceError;
pub use report::{EmotionReport, ImageInput};
pub use result::{Detection, FaceRegion, InferenceResult};
