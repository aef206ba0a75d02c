//! ML inference engine using Candle and rustface.
//!
//! Provides model loading and inference for:
//! - SeetaFace cascade (face localization)
//! - Emotion CNN (48x48 grayscale face classification)

mod cascade;
mod classifier;
mod device;
mod loader;
mod utils;

pub use cascade::{CascadeConfig, CascadeFaceLocator};
pub use classifier::CnnEmotionClassifier;
pub use device::{select_device, DevicePreference};
pub use loader::{load_artifact, LoadedArtifact, LABELS_METADATA_KEY};
pub use utils::argmax;
