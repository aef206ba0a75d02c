//! Model and inference arguments shared by `detect` and `serve`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use moodscan_adapters::models::{EMOTION_CLASSIFIER, FACE_DETECTOR};
use moodscan_adapters::{model_path, set_models_dir};
use moodscan_core::inference::{CascadeConfig, DevicePreference};
use moodscan_core::{EmotionLabel, FaceSelection, LabelSet, PipelineConfig};
use tracing::debug;

use crate::config::AppConfig;

fn parse_scale_factor(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (1.01..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 1.01..=100"))
    }
}

fn parse_min_face_size(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid size"))?;
    if value >= 20 {
        Ok(value)
    } else {
        Err(format!("{value} is smaller than the 20 pixel minimum"))
    }
}

fn parse_score_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{value} is not positive"))
    }
}

fn parse_window_step(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid step"))?;
    if value > 0 {
        Ok(value)
    } else {
        Err("window step must be positive".to_string())
    }
}

fn parse_label(s: &str) -> Result<String, String> {
    s.parse::<EmotionLabel>()
        .map(|label| label.as_str().to_string())
        .map_err(|e| e.to_string())
}

/// Where the models are and how to run them.
#[derive(Args, Clone, Default)]
pub struct PipelineArgs {
    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Face cascade model file (overrides the models directory)
    #[arg(long, value_name = "FILE")]
    pub face_model: Option<PathBuf>,

    /// Emotion classifier artifact (overrides the models directory)
    #[arg(long, value_name = "FILE")]
    pub classifier: Option<PathBuf>,

    /// Serving labels in classifier output order, comma-separated
    #[arg(long, value_delimiter = ',', value_parser = parse_label)]
    pub labels: Option<Vec<String>>,

    /// Face to classify when several are found: first or largest
    #[arg(long)]
    pub selection: Option<FaceSelection>,

    /// Run the classifier on the CPU even if a GPU is available
    #[arg(long)]
    pub cpu: bool,

    /// Pyramid scale step of the face locator (> 1.0)
    #[arg(long, value_parser = parse_scale_factor)]
    pub scale_factor: Option<f32>,

    /// Smallest face to look for, in pixels
    #[arg(long, value_parser = parse_min_face_size)]
    pub min_face_size: Option<u32>,

    /// Minimum cascade score for a face
    #[arg(long, value_parser = parse_score_threshold)]
    pub score_threshold: Option<f64>,

    /// Sliding-window step of the face locator, in pixels
    #[arg(long, value_parser = parse_window_step)]
    pub window_step: Option<u32>,
}

impl PipelineArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in `to_pipeline_config`)
    /// 2. Config file values
    /// 3. CLI arguments (already set on self)
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        if self.models_dir.is_none() {
            self.models_dir.clone_from(&config.models.dir);
        }
        if self.face_model.is_none() {
            self.face_model.clone_from(&config.models.face_model);
        }
        if self.classifier.is_none() {
            self.classifier.clone_from(&config.models.classifier);
        }
        if self.labels.is_none() {
            self.labels.clone_from(&config.classifier.labels);
        }
        if self.selection.is_none() {
            self.selection = config
                .classifier
                .selection
                .as_deref()
                .and_then(|s| s.parse().ok());
        }
        if !self.cpu {
            self.cpu = config.classifier.device.as_deref() == Some("cpu");
        }

        self.scale_factor = self.scale_factor.or(config.locator.scale_factor);
        self.min_face_size = self.min_face_size.or(config.locator.min_face_size);
        self.score_threshold = self.score_threshold.or(config.locator.score_threshold);
        self.window_step = self.window_step.or(config.locator.window_step);

        self
    }

    /// Resolves model paths and settings into a pipeline configuration.
    ///
    /// Applies the models directory override as a side effect.
    ///
    /// # Errors
    ///
    /// Returns an error if a model file is missing or a setting is invalid.
    pub fn to_pipeline_config(&self) -> Result<PipelineConfig> {
        if let Some(ref models_dir) = self.models_dir {
            debug!("Using custom models directory: {}", models_dir.display());
            set_models_dir(Some(models_dir.clone()));
        }

        let face_model = match self.face_model {
            Some(ref path) => path.clone(),
            None => model_path(FACE_DETECTOR).context("face detector is not registered")?,
        };
        require_file(
            &face_model,
            "Face detector model",
            "Run `moodscan models fetch` or pass --face-model.",
        )?;

        let classifier = match self.classifier {
            Some(ref path) => path.clone(),
            None => model_path(EMOTION_CLASSIFIER).context("emotion classifier is not registered")?,
        };
        require_file(
            &classifier,
            "Emotion classifier",
            "Copy a trained artifact there or pass --classifier.",
        )?;

        let mut config = PipelineConfig::new(face_model, classifier);

        if let Some(ref names) = self.labels {
            config.labels = LabelSet::parse(names)?;
        }

        let defaults = CascadeConfig::default();
        config.cascade = CascadeConfig {
            scale_factor: self.scale_factor.unwrap_or(defaults.scale_factor),
            min_face_size: self.min_face_size.unwrap_or(defaults.min_face_size),
            score_threshold: self.score_threshold.unwrap_or(defaults.score_threshold),
            window_step: self.window_step.unwrap_or(defaults.window_step),
        };
        config.cascade.validate().map_err(anyhow::Error::msg)?;

        config.selection = self.selection.unwrap_or_default();
        config.device = if self.cpu {
            DevicePreference::Cpu
        } else {
            DevicePreference::Auto
        };

        Ok(config)
    }
}

fn require_file(path: &Path, what: &str, hint: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        anyhow::bail!("{what} not found at {}. {hint}", path.display())
    }
}
