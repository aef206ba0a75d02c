//! Configuration file support for moodscan.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/moodscan/config.toml` (lowest priority)
//! - Project-local: `.moodscan.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)
//!
//! `--config <FILE>` replaces both file sources with a single explicit file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use moodscan_core::{EmotionLabel, FaceSelection};
use serde::Deserialize;
use tracing::{debug, info};

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Model file locations.
    pub models: ModelsConfig,
    /// Face locator settings.
    pub locator: LocatorConfig,
    /// Emotion classifier settings.
    pub classifier: ClassifierConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Generative-text service settings.
    pub chat: ChatConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
}

/// Model configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Custom models directory path.
    pub dir: Option<PathBuf>,
    /// Explicit face cascade model file.
    pub face_model: Option<PathBuf>,
    /// Explicit classifier artifact file.
    pub classifier: Option<PathBuf>,
}

/// Cascade face locator configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Pyramid scale step (> 1.0).
    pub scale_factor: Option<f32>,
    /// Smallest face size in pixels.
    pub min_face_size: Option<u32>,
    /// Minimum cascade score.
    pub score_threshold: Option<f64>,
    /// Sliding-window step in pixels.
    pub window_step: Option<u32>,
}

/// Classifier configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Serving labels in classifier output order.
    pub labels: Option<Vec<String>>,
    /// Face selection policy: "first" or "largest".
    pub selection: Option<String>,
    /// Inference device: "auto" or "cpu".
    pub device: Option<String>,
}

/// HTTP server configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Origins allowed by CORS.
    pub cors_origins: Option<Vec<String>>,
}

/// Generative-text service configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// API base URL.
    pub endpoint: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// Sampling temperature (0.0-2.0).
    pub temperature: Option<f32>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/moodscan/config.toml`
    /// 2. Project-local: `.moodscan.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Load configuration from one explicit file.
    ///
    /// Unlike [`AppConfig::load`], an unreadable, unparsable or invalid
    /// file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        info!("Loading config: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        Ok(config)
    }

    /// Validate configuration values are within acceptable ranges.
    fn validate(&self) -> Result<(), String> {
        if let Some(s) = self.locator.scale_factor {
            if !(1.01..=100.0).contains(&s) {
                return Err(format!("locator.scale_factor must be 1.01-100, got {s}"));
            }
        }
        if let Some(size) = self.locator.min_face_size {
            if size < 20 {
                return Err(format!("locator.min_face_size must be at least 20, got {size}"));
            }
        }
        if let Some(t) = self.locator.score_threshold {
            if t <= 0.0 || t.is_nan() {
                return Err(format!("locator.score_threshold must be positive, got {t}"));
            }
        }
        if self.locator.window_step == Some(0) {
            return Err("locator.window_step must be positive".to_string());
        }

        if let Some(ref labels) = self.classifier.labels {
            if labels.is_empty() {
                return Err("classifier.labels must not be empty".to_string());
            }
            for label in labels {
                label
                    .parse::<EmotionLabel>()
                    .map_err(|e| format!("classifier.labels: {e}"))?;
            }
        }
        if let Some(ref s) = self.classifier.selection {
            s.parse::<FaceSelection>()
                .map_err(|e| format!("classifier.selection: {e}"))?;
        }
        if let Some(ref d) = self.classifier.device {
            if d != "auto" && d != "cpu" {
                return Err(format!(
                    "classifier.device must be 'auto' or 'cpu', got '{d}'"
                ));
            }
        }

        if let Some(t) = self.chat.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("chat.temperature must be 0.0-2.0, got {t}"));
            }
        }
        if self.chat.timeout_secs == Some(0) {
            return Err("chat.timeout_secs must be positive".to_string());
        }

        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                return Err(format!(
                    "output.format must be 'json' or 'jsonl', got '{f}'"
                ));
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        // General
        self.general.recursive = other.general.recursive.or(self.general.recursive);

        // Models
        self.models.dir = other.models.dir.or_else(|| self.models.dir.take());
        self.models.face_model = other
            .models
            .face_model
            .or_else(|| self.models.face_model.take());
        self.models.classifier = other
            .models
            .classifier
            .or_else(|| self.models.classifier.take());

        // Locator
        self.locator.scale_factor = other.locator.scale_factor.or(self.locator.scale_factor);
        self.locator.min_face_size = other.locator.min_face_size.or(self.locator.min_face_size);
        self.locator.score_threshold = other
            .locator
            .score_threshold
            .or(self.locator.score_threshold);
        self.locator.window_step = other.locator.window_step.or(self.locator.window_step);

        // Classifier
        self.classifier.labels = other
            .classifier
            .labels
            .or_else(|| self.classifier.labels.take());
        self.classifier.selection = other
            .classifier
            .selection
            .or_else(|| self.classifier.selection.take());
        self.classifier.device = other
            .classifier
            .device
            .or_else(|| self.classifier.device.take());

        // Server
        self.server.host = other.server.host.or_else(|| self.server.host.take());
        self.server.port = other.server.port.or(self.server.port);
        self.server.cors_origins = other
            .server
            .cors_origins
            .or_else(|| self.server.cors_origins.take());

        // Chat
        self.chat.endpoint = other.chat.endpoint.or_else(|| self.chat.endpoint.take());
        self.chat.model = other.chat.model.or_else(|| self.chat.model.take());
        self.chat.temperature = other.chat.temperature.or(self.chat.temperature);
        self.chat.api_key_env = other
            .chat
            .api_key_env
            .or_else(|| self.chat.api_key_env.take());
        self.chat.timeout_secs = other.chat.timeout_secs.or(self.chat.timeout_secs);

        // Output
        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("moodscan").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.moodscan.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(".moodscan.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
