//! End-to-end detection tests against a real face detector.
//!
//! These need the SeetaFace cascade, which is too large to vendor. Run with
//!
//! ```text
//! MOODSCAN_FACE_MODEL=/path/to/seeta_fd_frontal_v1.0.bin \
//! MOODSCAN_FACE_IMAGE=/path/to/portrait.jpg \
//!     cargo test -p moodscan-cli --test pipeline -- --ignored
//! ```
//!
//! The classifier is a small generated artifact whose output is fixed, so
//! the label of a detected face is known in advance.

#![allow(clippy::unwrap_used, clippy::float_cmp, deprecated)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use moodscan_core::LabelSet;
use moodscan_test_support::{ArtifactBuilder, SyntheticImageBuilder};
use serde_json::Value;

const HAPPY: usize = 4;

struct Models {
    dir: tempfile::TempDir,
}

impl Models {
    /// Sets up a models directory, or `None` when the cascade is unavailable.
    fn prepare() -> Option<Self> {
        let Some(cascade) = std::env::var_os("MOODSCAN_FACE_MODEL").map(PathBuf::from) else {
            eprintln!("MOODSCAN_FACE_MODEL not set, skipping");
            return None;
        };
        let dir = tempfile::tempdir().unwrap();
        std::fs::copy(&cascade, dir.path().join("seeta_fd_frontal_v1.0.bin")).unwrap();
        ArtifactBuilder::for_labels(&LabelSet::default())
            .favor(HAPPY, 6.0)
            .write(&dir.path().join("emotion_classifier.safetensors"))
            .unwrap();
        Some(Self { dir })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("moodscan").unwrap();
        cmd.env("XDG_CONFIG_HOME", self.dir.path())
            .arg("detect")
            .arg("--models-dir")
            .arg(self.dir.path());
        cmd
    }
}

fn face_image() -> Option<PathBuf> {
    let image = std::env::var_os("MOODSCAN_FACE_IMAGE").map(PathBuf::from);
    if image.is_none() {
        eprintln!("MOODSCAN_FACE_IMAGE not set, skipping");
    }
    image
}

fn reports(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn gray_image(dir: &Path) -> PathBuf {
    SyntheticImageBuilder::write(dir, "blank.png", SyntheticImageBuilder::uniform_gray(320, 240, 128))
        .unwrap()
}

#[test]
#[ignore = "needs MOODSCAN_FACE_MODEL and MOODSCAN_FACE_IMAGE"]
fn test_portrait_is_classified() {
    let Some(models) = Models::prepare() else {
        return;
    };
    let Some(image) = face_image() else {
        return;
    };

    let output = models.command().arg(&image).output().unwrap();
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));

    let reports = reports(&output.stdout);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["detected_emotion"], "happy");
    assert!(reports[0]["face"]["width"].as_u64().unwrap() >= 20);
    assert!(reports[0]["recommendation"].as_str().is_some_and(|r| !r.is_empty()));
}

#[test]
#[ignore = "needs MOODSCAN_FACE_MODEL"]
fn test_blank_image_reports_no_face() {
    let Some(models) = Models::prepare() else {
        return;
    };
    let images = tempfile::tempdir().unwrap();
    let blank = gray_image(images.path());

    let output = models.command().arg(&blank).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let reports = reports(&output.stdout);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["detected_emotion"], "no_face");
    assert_eq!(reports[0]["confidence"].as_f64(), Some(0.0));
    assert!(reports[0].get("face").is_none());
}

#[test]
#[ignore = "needs MOODSCAN_FACE_MODEL"]
fn test_json_format_is_one_array() {
    let Some(models) = Models::prepare() else {
        return;
    };
    let images = tempfile::tempdir().unwrap();
    gray_image(images.path());
    SyntheticImageBuilder::write(
        images.path(),
        "checks.png",
        SyntheticImageBuilder::checkerboard(320, 240, 16),
    )
    .unwrap();

    let output = models
        .command()
        .args(["--format", "json"])
        .arg(images.path())
        .output()
        .unwrap();

    let parsed: Value = serde_json::from_slice(&output.stdout).unwrap();
    let array = parsed.as_array().unwrap();
    assert_eq!(array.len(), 2);
    assert!(array[0]["path"].as_str().unwrap().ends_with("blank.png"));
}

#[test]
#[ignore = "needs MOODSCAN_FACE_MODEL"]
fn test_undecodable_file_is_skipped() {
    let Some(models) = Models::prepare() else {
        return;
    };
    let images = tempfile::tempdir().unwrap();
    let blank = gray_image(images.path());
    let broken = images.path().join("broken.jpg");
    std::fs::write(&broken, b"not a jpeg").unwrap();

    let output = models.command().arg(&broken).arg(&blank).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(reports(&output.stdout).len(), 1);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Skipping"));
}
