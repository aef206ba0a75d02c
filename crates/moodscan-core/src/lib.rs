//! Moodscan Core - Domain logic and the emotion inference pipeline
//!
//! This crate contains the core domain types, the port traits, image
//! preprocessing, the candle emotion classifier, the cascade face locator,
//! the pipeline that ties them together, and the recommendation and chat
//! prompt logic served next to it.

pub mod chat;
pub mod domain;
pub mod inference;
pub mod pipeline;
pub mod ports;
pub mod preprocess;
pub mod recommend;

pub use chat::{ChatError, ChatReply, ChatRequest, ChatResponder};
pub use domain::{
    Detection, EmotionLabel, EmotionReport, FaceRegion, ImageInput, InferenceError,
    InferenceResult, LabelSet,
};
pub use pipeline::{EmotionPipeline, FaceSelection, PipelineConfig};
pub use ports::{EmotionClassifier, FaceLocator, ImageSource, ResultOutput, TextGenerator};
pub use recommend::recommend;
