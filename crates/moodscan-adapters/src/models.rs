//! Model registry, downloading and caching adapter.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Registry name of the face cascade model.
pub const FACE_DETECTOR: &str = "face_detector";

/// Registry name of the emotion classifier artifact.
pub const EMOTION_CLASSIFIER: &str = "emotion_classifier";

/// Model metadata.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name/identifier.
    pub name: &'static str,
    /// Download URL, if the model is publicly available.
    pub url: Option<&'static str>,
    /// Expected SHA256 hash, if known.
    pub sha256: Option<&'static str>,
    /// Filename in models directory.
    pub filename: &'static str,
    /// One-line description for listings.
    pub description: &'static str,
}

impl ModelInfo {
    /// Whether `models fetch` can download this model.
    #[must_use]
    pub const fn is_downloadable(&self) -> bool {
        self.url.is_some()
    }
}

/// Known models.
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: FACE_DETECTOR,
        url: Some(
            "https://github.com/atomashpolskiy/rustface/raw/master/model/seeta_fd_frontal_v1.0.bin",
        ),
        sha256: None,
        filename: "seeta_fd_frontal_v1.0.bin",
        description: "SeetaFace frontal face cascade",
    },
    ModelInfo {
        name: EMOTION_CLASSIFIER,
        url: None,
        sha256: None,
        filename: "emotion_classifier.safetensors",
        description: "48x48 grayscale emotion CNN (trained offline, copy in manually)",
    },
];

/// Progress callback: `(model name, bytes downloaded, total bytes if known)`.
pub type ProgressCallback = Box<dyn Fn(&str, u64, Option<u64>) + Send + Sync>;

static MODELS_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Overrides the models directory for this process. `None` restores the default.
pub fn set_models_dir(dir: Option<PathBuf>) {
    *MODELS_DIR_OVERRIDE
        .write()
        .unwrap_or_else(PoisonError::into_inner) = dir;
}

/// Returns the models directory path.
///
/// Uses the override from [`set_models_dir`] if set, else
/// `XDG_DATA_HOME/moodscan/models` or `~/.local/share/moodscan/models`.
#[must_use]
pub fn models_dir() -> PathBuf {
    if let Some(dir) = MODELS_DIR_OVERRIDE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
    {
        return dir;
    }
    default_models_dir()
}

fn default_models_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("moodscan")
        .join("models")
}

/// Looks up a model by name.
#[must_use]
pub fn model_info(name: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.name == name)
}

/// Returns the path to a specific model file.
#[must_use]
pub fn model_path(name: &str) -> Option<PathBuf> {
    model_info(name).map(|m| models_dir().join(m.filename))
}

/// Ensures all downloadable models are present, reporting download progress.
///
/// Models without a download URL are only checked; a missing one is logged
/// with a hint on where to put it.
///
/// # Errors
///
/// Returns an error if:
/// - The models directory cannot be created
/// - A model download fails
/// - A model's checksum doesn't match
pub fn ensure_models_with_progress(progress: Option<&ProgressCallback>) -> Result<()> {
    let dir = models_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create models directory {}", dir.display()))?;

    for model in MODELS {
        let path = dir.join(model.filename);
        if path.exists() {
            debug!("Model {} already exists", model.name);
            continue;
        }
        match model.url {
            Some(url) => download_model(model, url, &path, progress)?,
            None => warn!(
                "{} is not downloadable; copy it to {}",
                model.name,
                path.display()
            ),
        }
    }

    Ok(())
}

/// Downloads a model from its URL into `path`.
fn download_model(
    model: &ModelInfo,
    url: &str,
    path: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<()> {
    info!("Downloading model: {}", model.name);

    let mut response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to download {}", model.name))?;

    if !response.status().is_success() {
        anyhow::bail!("Download of {} failed with status: {}", model.name, response.status());
    }

    let total = response.content_length();
    let mut bytes = Vec::with_capacity(usize::try_from(total.unwrap_or(0)).unwrap_or(0));
    let mut chunk = [0u8; 64 * 1024];
    loop {
        let n = response
            .read(&mut chunk)
            .with_context(|| format!("Failed to read response for {}", model.name))?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);
        if let Some(cb) = progress {
            cb(model.name, bytes.len() as u64, total);
        }
    }

    match model.sha256 {
        Some(expected) => verify_checksum(&bytes, expected).with_context(|| {
            format!(
                "{} failed verification. Try deleting {} and re-running to download a fresh copy.",
                model.name,
                path.display()
            )
        })?,
        None => debug!("No checksum known for {}, skipping verification", model.name),
    }

    // Only a complete, verified download is renamed into place.
    let partial = path.with_extension("part");
    {
        let mut file = fs::File::create(&partial)
            .with_context(|| format!("Failed to create {}", partial.display()))?;
        file.write_all(&bytes)
            .with_context(|| format!("Failed to write {}", model.name))?;
    }
    fs::rename(&partial, path).with_context(|| format!("Failed to install {}", model.name))?;

    info!("Downloaded {} ({} bytes)", model.name, bytes.len());
    Ok(())
}

/// Checks `bytes` against a hex SHA256 digest.
///
/// # Errors
///
/// Returns an error describing both digests on mismatch.
pub fn verify_checksum(bytes: &[u8], expected: &str) -> Result<()> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let hash = format!("{:x}", hasher.finalize());

    if hash.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        anyhow::bail!("checksum mismatch: expected {expected}, got {hash}")
    }
}

/// Lists installed models with their status.
#[must_use]
pub fn list_models() -> Vec<(String, bool)> {
    let dir = models_dir();
    MODELS
        .iter()
        .map(|m| (m.name.to_string(), dir.join(m.filename).exists()))
        .collect()
}
