//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the domain core and external adapters.

mod classifier;
mod face_locator;
mod image_source;
mod result_output;
mod text_generator;

pub use classifier::EmotionClassifier;
pub use face_locator::FaceLocator;
pub use image_source::ImageSource;
pub use result_output::ResultOutput;
pub use text_generator::TextGenerator;
