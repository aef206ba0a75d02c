//! Synthetic image and artifact builders for testing.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, RgbImage};
use moodscan_core::inference::LABELS_METADATA_KEY;
use moodscan_core::{ImageInput, LabelSet};
use safetensors::tensor::TensorView;
use tempfile::NamedTempFile;

/// Builder for creating synthetic test images.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    /// Creates a uniform gray image.
    #[must_use]
    pub fn uniform_gray(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([value]))
    }

    /// Creates a high-contrast checkerboard pattern.
    #[must_use]
    pub fn checkerboard(width: u32, height: u32, cell_size: u32) -> GrayImage {
        let cell = cell_size.max(1);
        GrayImage::from_fn(width, height, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        })
    }

    /// Creates a smooth horizontal gradient from black to white.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn horizontal_gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            let val = ((u32::from(u8::MAX) * x) / width.max(1)) as u8;
            Luma([val])
        })
    }

    /// Creates a uniform RGB image.
    #[must_use]
    pub fn rgb_uniform(width: u32, height: u32, r: u8, g: u8, b: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, image::Rgb([r, g, b]))
    }

    /// Encodes an image as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn png_bytes(image: impl Into<DynamicImage>) -> Result<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        image
            .into()
            .write_to(&mut bytes, ImageFormat::Png)
            .context("encoding PNG")?;
        Ok(bytes.into_inner())
    }

    /// Wraps an encoded image as a pipeline input.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn input(path: &str, image: impl Into<DynamicImage>) -> Result<ImageInput> {
        Ok(ImageInput::new(path, Self::png_bytes(image)?))
    }

    /// Writes an image as `dir/name`, in the format implied by the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(dir: &Path, name: &str, image: impl Into<DynamicImage>) -> Result<PathBuf> {
        let path = dir.join(name);
        image
            .into()
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

/// Builds emotion classifier artifacts in safetensors format.
///
/// All weights are zero, so the network's output is the softmax of the
/// final bias. [`ArtifactBuilder::favor`] raises one logit to make a
/// chosen label win with a predictable probability.
#[derive(Debug, Clone)]
pub struct ArtifactBuilder {
    num_outputs: usize,
    favored: Option<(usize, f32)>,
    labels: Option<Vec<String>>,
}

impl ArtifactBuilder {
    /// An artifact with `num_outputs` output units and no declared labels.
    #[must_use]
    pub const fn new(num_outputs: usize) -> Self {
        Self {
            num_outputs,
            favored: None,
            labels: None,
        }
    }

    /// An artifact matching `labels`, declaring them in its metadata.
    #[must_use]
    pub fn for_labels(labels: &LabelSet) -> Self {
        Self::new(labels.len()).declare_labels(&labels.names())
    }

    /// Declares training labels in the header metadata.
    #[must_use]
    pub fn declare_labels<S: AsRef<str>>(mut self, labels: &[S]) -> Self {
        self.labels = Some(labels.iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    /// Removes any declared labels.
    #[must_use]
    pub fn without_labels(mut self) -> Self {
        self.labels = None;
        self
    }

    /// Sets the final bias of output `index` to `logit`.
    #[must_use]
    pub const fn favor(mut self, index: usize, logit: f32) -> Self {
        self.favored = Some((index, logit));
        self
    }

    /// Probability the favored output will get, if any.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn favored_probability(&self) -> Option<f32> {
        self.favored.map(|(_, logit)| {
            let e = logit.exp();
            e / (e + (self.num_outputs - 1) as f32)
        })
    }

    /// Serializes the artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn build(&self) -> Result<Vec<u8>> {
        let tensors = self.tensors();
        let bytes: Vec<(String, Vec<usize>, Vec<u8>)> = tensors
            .into_iter()
            .map(|(name, shape, data)| (name, shape, bytemuck::cast_slice(&data).to_vec()))
            .collect();

        let mut views = HashMap::new();
        for (name, shape, data) in &bytes {
            let view = TensorView::new(safetensors::Dtype::F32, shape.clone(), data)
                .with_context(|| format!("building tensor {name}"))?;
            views.insert(name.clone(), view);
        }

        let metadata = self
            .labels
            .as_ref()
            .map(|labels| HashMap::from([(LABELS_METADATA_KEY.to_string(), labels.join(","))]));

        safetensors::serialize(&views, &metadata).context("serializing artifact")
    }

    /// Writes the artifact to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = self.build()?;
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
    }

    /// Writes the artifact to a temporary file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_temp(&self) -> Result<NamedTempFile> {
        let bytes = self.build()?;
        let mut file = NamedTempFile::new().context("creating temp artifact")?;
        file.write_all(&bytes).context("writing temp artifact")?;
        file.flush()?;
        Ok(file)
    }

    fn tensors(&self) -> Vec<(String, Vec<usize>, Vec<f32>)> {
        let mut out = Vec::new();
        let mut zeros = |name: &str, shape: Vec<usize>| {
            let len = shape.iter().product();
            out.push((name.to_string(), shape, vec![0.0f32; len]));
        };

        for (name, cin, cout) in [("conv1", 1, 32), ("conv2", 32, 64), ("conv3", 64, 128)] {
            zeros(&format!("{name}.weight"), vec![cout, cin, 3, 3]);
            zeros(&format!("{name}.bias"), vec![cout]);
        }
        for (name, fin, fout) in [("fc1", 128 * 4 * 4, 256), ("fc2", 256, 128)] {
            zeros(&format!("{name}.weight"), vec![fout, fin]);
            zeros(&format!("{name}.bias"), vec![fout]);
        }
        zeros("fc3.weight", vec![self.num_outputs, 128]);

        for (name, n) in [("bn1", 256), ("bn2", 128)] {
            out.push((format!("{name}.weight"), vec![n], vec![1.0; n]));
            out.push((format!("{name}.bias"), vec![n], vec![0.0; n]));
            out.push((format!("{name}.running_mean"), vec![n], vec![0.0; n]));
            out.push((format!("{name}.running_var"), vec![n], vec![1.0; n]));
        }

        let mut bias = vec![0.0f32; self.num_outputs];
        if let Some((index, logit)) = self.favored {
            if let Some(b) = bias.get_mut(index) {
                *b = logit;
            }
        }
        out.push(("fc3.bias".to_string(), vec![self.num_outputs], bias));
        out
    }
}
