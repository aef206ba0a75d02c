//! Progress bar adapter using indicatif.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use moodscan_core::EmotionReport;

/// Progress reporting for the detect command.
///
/// Shows a bar when requested, otherwise one status line per image
/// without a face. Skipped images are always reported unless quiet.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    quiet: bool,
}

impl ProgressBar {
    /// Creates a new progress bar.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of items, if known
    /// * `quiet` - If true, suppress all output
    /// * `show_bar` - If true, show progress bar; otherwise show per-item status
    #[must_use]
    pub fn new(total: Option<u64>, quiet: bool, show_bar: bool) -> Self {
        if quiet {
            return Self {
                bar: None,
                quiet: true,
            };
        }

        let bar = if show_bar {
            let bar = total.map_or_else(IndicatifBar::new_spinner, IndicatifBar::new);

            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }

            Some(bar)
        } else {
            None
        };

        Self { bar, quiet }
    }

    /// A progress reporter that prints nothing.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::new(None, true, false)
    }

    /// An image is about to be analyzed.
    pub fn started(&self, path: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(path.to_string());
        }
    }

    /// An image was analyzed.
    pub fn completed(&self, report: &EmotionReport) {
        if self.quiet {
            return;
        }
        if let Some(bar) = &self.bar {
            bar.inc(1);
        } else if !report.has_face() {
            eprintln!("{}: no face detected", report.path);
        }
    }

    /// An image could not be analyzed.
    pub fn skipped(&self, path: &str, reason: &str) {
        if self.quiet {
            return;
        }
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
        eprintln!("WARN: Skipping {path}: {reason}");
    }

    /// All images were handled.
    pub fn finished(&self, processed: usize, skipped: usize) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(format!("Done: {processed} processed, {skipped} skipped"));
        }
    }
}
