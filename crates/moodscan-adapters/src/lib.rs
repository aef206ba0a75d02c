//! Moodscan Adapters - External adapters for moodscan.
//!
//! This crate provides adapters for:
//! - Filesystem image source
//! - Model registry, downloading and caching
//! - Gemini text generation for the chat responder

pub mod fs;
pub mod gemini;
pub mod models;

pub use fs::FsImageSource;
pub use gemini::{GeminiClient, GeminiConfig};
pub use models::{model_path, models_dir, set_models_dir};
