//! Integration tests for reading raster images from disk.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use moodscan_adapters::FsImageSource;
use moodscan_core::{ImageInput, ImageSource};
use moodscan_test_support::SyntheticImageBuilder;
use std::path::Path;

fn write_fixture(dir: &Path, name: &str) -> std::path::PathBuf {
    SyntheticImageBuilder::write(dir, name, SyntheticImageBuilder::rgb_uniform(8, 8, 120, 80, 40))
        .expect("fixture should encode")
}

fn load_single(path: &Path) -> ImageInput {
    let source = FsImageSource::new(vec![path.to_path_buf()], false);
    let images: Vec<_> = source.images().collect();
    assert_eq!(images.len(), 1);
    images.into_iter().next().unwrap().expect("should load")
}

#[test]
fn test_load_formats() {
    let dir = tempfile::tempdir().unwrap();

    for name in ["test.png", "test.jpg", "test.bmp", "test.tiff", "test.gif"] {
        let path = write_fixture(dir.path(), name);
        let input = load_single(&path);

        assert!(input.path.ends_with(name));
        assert_eq!(input.bytes, std::fs::read(&path).unwrap());
        image::load_from_memory(&input.bytes).expect("bytes should decode");
    }
}

#[test]
fn test_explicit_non_image_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "not an image").unwrap();

    let source = FsImageSource::new(vec![notes], false);
    assert_eq!(source.images().count(), 0);
}

#[test]
fn test_missing_path_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let source = FsImageSource::new(vec![dir.path().join("absent.png")], false);
    assert_eq!(source.images().count(), 0);
    assert_eq!(source.count_hint(), Some(0));
}

#[test]
fn test_load_directory_sorted() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "c.png");
    write_fixture(dir.path(), "a.jpg");
    write_fixture(dir.path(), "b.bmp");
    std::fs::write(dir.path().join("readme.md"), "# faces").unwrap();

    let source = FsImageSource::new(vec![dir.path().to_path_buf()], false);
    let names: Vec<String> = source
        .images()
        .map(|r| {
            let input = r.expect("all written images should load");
            Path::new(&input.path)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();

    assert_eq!(names, vec!["a.jpg", "b.bmp", "c.png"]);
}

#[test]
fn test_recursion_is_opt_in() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested");
    std::fs::create_dir(&nested).unwrap();
    write_fixture(dir.path(), "top.png");
    write_fixture(&nested, "deep.png");

    let flat = FsImageSource::new(vec![dir.path().to_path_buf()], false);
    assert_eq!(flat.images().count(), 1);

    let recursive = FsImageSource::new(vec![dir.path().to_path_buf()], true);
    assert_eq!(recursive.images().count(), 2);
}

#[test]
fn test_count_hint() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["one.png", "two.png", "three.gif"] {
        write_fixture(dir.path(), name);
    }

    let source = FsImageSource::new(vec![dir.path().to_path_buf()], false);
    assert_eq!(source.count_hint(), Some(3));
}
