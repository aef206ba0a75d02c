//! Detect command - classify the emotion on faces in image files.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use moodscan_adapters::FsImageSource;
use moodscan_core::{EmotionPipeline, EmotionReport, ImageSource, InferenceError, ResultOutput};
use tracing::{debug, info};

use super::pipeline::PipelineArgs;
use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{JsonOutput, ProgressBar};

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON array
    Json,
}

/// Arguments for the detect command.
#[derive(Args, Clone)]
pub struct DetectArgs {
    /// Files or directories to analyze
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,
}

impl DetectArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        if !self.recursive {
            self.recursive = config.general.recursive.unwrap_or(false);
        }

        self.pipeline = self.pipeline.with_config(config);

        if self.format.is_none() {
            self.format = config
                .output
                .format
                .as_deref()
                .and_then(|s| match s {
                    "json" => Some(OutputFormat::Json),
                    "jsonl" => Some(OutputFormat::Jsonl),
                    _ => None,
                });
        }

        if !self.pretty {
            self.pretty = config.output.pretty.unwrap_or(false);
        }
        if !self.progress {
            self.progress = config.output.progress.unwrap_or(false);
        }

        self
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

/// Result of running the detect command.
#[derive(Debug)]
pub struct DetectResult {
    /// Number of images analyzed.
    pub processed: usize,
    /// Number of images skipped.
    pub skipped: usize,
    /// Number of analyzed images without a face.
    pub without_face: usize,
    /// Reports held back for a single JSON array (empty for JSONL).
    pub reports: Vec<EmotionReport>,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Run the detect command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
pub fn run(args: &DetectArgs) -> Result<DetectResult> {
    info!("Running detect command on {} paths", args.paths.len());

    let config = args.pipeline.to_pipeline_config()?;
    let pipeline = EmotionPipeline::load(&config).context("Failed to load models")?;

    let source = FsImageSource::new(args.paths.clone(), args.recursive);
    let total = source.count_hint();

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress = ProgressBar::new(total.map(|t| t as u64), args.quiet, show_progress);

    let output = JsonOutput::stdout();
    let result = process_images(&source, &pipeline, &output, &progress, args.format())?;

    if args.format() == OutputFormat::Json {
        output.write_array(&result.reports, args.pretty)?;
    }
    output.flush()?;

    info!(
        "Done: {} processed, {} skipped, {} without a face",
        result.processed, result.skipped, result.without_face
    );
    Ok(result)
}

/// Run every image from `source` through the pipeline.
///
/// JSONL reports are written as they are produced. JSON reports are
/// collected in the returned result for the caller to write as one array.
/// Unreadable and undecodable images are skipped with a warning.
///
/// # Errors
///
/// Returns an error if writing a report fails or inference fails for a
/// reason other than a bad image.
pub fn process_images(
    source: &dyn ImageSource,
    pipeline: &EmotionPipeline,
    output: &dyn ResultOutput,
    progress: &ProgressBar,
    format: OutputFormat,
) -> Result<DetectResult> {
    let mut processed = 0usize;
    let mut skipped = 0usize;
    let mut without_face = 0usize;
    let mut reports = Vec::new();

    for (index, item) in source.images().enumerate() {
        let image = match item {
            Ok(image) => image,
            Err(e) => {
                progress.skipped(&format!("image {index}"), &format!("{e:#}"));
                skipped += 1;
                continue;
            }
        };

        progress.started(&image.path);

        let result = match pipeline.infer(&image.bytes) {
            Ok(result) => result,
            Err(e @ InferenceError::Decode(_)) => {
                progress.skipped(&image.path, &e.to_string());
                skipped += 1;
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Inference failed for {}", image.path));
            }
        };
        debug!(
            "{}: {} ({:.3})",
            image.path, result.detection, result.confidence
        );

        let report = EmotionReport::from_result(image.path, iso_timestamp(), &result);
        if !report.has_face() {
            without_face += 1;
        }
        progress.completed(&report);

        match format {
            OutputFormat::Jsonl => output.write(&report)?,
            OutputFormat::Json => reports.push(report),
        }
        processed += 1;
    }

    progress.finished(processed, skipped);

    let exit_code = if without_face > 0 {
        ExitCode::NoFace
    } else {
        ExitCode::Success
    };

    Ok(DetectResult {
        processed,
        skipped,
        without_face,
        reports,
        exit_code,
    })
}

/// Generate ISO 8601 UTC timestamp (RFC 3339 format).
fn iso_timestamp() -> String {
    match time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}
