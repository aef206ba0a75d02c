//! Artifact loading for safetensors files.
//!
//! The classifier artifact may declare its training labels in the
//! safetensors header metadata under [`LABELS_METADATA_KEY`], as a
//! comma-separated list in output order.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use tracing::debug;

use crate::domain::InferenceError;

/// Metadata key holding the comma-separated training labels.
pub const LABELS_METADATA_KEY: &str = "labels";

/// A parsed safetensors artifact.
pub struct LoadedArtifact {
    /// Weights, converted to `f32` on access.
    pub vb: VarBuilder<'static>,
    /// Training labels declared in the header, if any.
    pub labels: Option<Vec<String>>,
}

/// Reads a safetensors file into a `VarBuilder` plus its declared labels.
///
/// # Errors
///
/// Returns [`InferenceError::ArtifactLoad`] if:
/// - The file cannot be read
/// - The safetensors data is invalid
/// - A tensor has an unsupported dtype
pub fn load_artifact(path: impl AsRef<Path>, device: &Device) -> Result<LoadedArtifact, InferenceError> {
    let path = path.as_ref();
    debug!("Loading safetensors from {}", path.display());

    let data = std::fs::read(path).map_err(|e| InferenceError::artifact(path, e))?;

    let (_, metadata) =
        SafeTensors::read_metadata(&data).map_err(|e| InferenceError::artifact(path, e))?;
    let labels = metadata
        .metadata()
        .as_ref()
        .and_then(|m| m.get(LABELS_METADATA_KEY))
        .map(|raw| parse_label_list(raw));

    let tensors = SafeTensors::deserialize(&data).map_err(|e| InferenceError::artifact(path, e))?;

    let mut tensor_map: HashMap<String, Tensor> = HashMap::new();
    for name in tensors.names() {
        let view = tensors
            .tensor(name)
            .map_err(|e| InferenceError::artifact(path, format!("tensor '{name}': {e}")))?;

        let dtype = safetensors_dtype_to_candle(view.dtype())
            .map_err(|e| InferenceError::artifact(path, format!("tensor '{name}': {e}")))?;

        let tensor = Tensor::from_raw_buffer(view.data(), dtype, view.shape(), device)
            .map_err(|e| InferenceError::artifact(path, format!("tensor '{name}': {e}")))?;

        tensor_map.insert(name.clone(), tensor);
    }

    debug!(
        "Loaded {} tensors from {} (labels: {:?})",
        tensor_map.len(),
        path.display(),
        labels
    );

    Ok(LoadedArtifact {
        vb: VarBuilder::from_tensors(tensor_map, DType::F32, device),
        labels,
    })
}

/// Splits a comma-separated label list, trimming blanks.
fn parse_label_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Converts safetensors dtype to candle dtype.
fn safetensors_dtype_to_candle(dtype: safetensors::Dtype) -> Result<DType, String> {
    use safetensors::Dtype as S;
    match dtype {
        S::F32 => Ok(DType::F32),
        S::F64 => Ok(DType::F64),
        S::F16 => Ok(DType::F16),
        S::BF16 => Ok(DType::BF16),
        S::I64 => Ok(DType::I64),
        S::U8 => Ok(DType::U8),
        S::U32 => Ok(DType::U32),
        other => Err(format!("unsupported dtype {other:?}")),
    }
}
