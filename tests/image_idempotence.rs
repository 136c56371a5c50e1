// tests/image_idempotence.rs

use std::error::Error;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use assetpipe::errors::PipelineError;
use assetpipe::fs::RealFileSystem;
use assetpipe::reload::NoopNotifier;
use assetpipe::tasks::imagemin::compress;
use assetpipe::tasks::Pipeline;
use assetpipe_test_utils::builders::ConfigFileBuilder;
use assetpipe_test_utils::init_tracing;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

type TestResult = Result<(), Box<dyn Error>>;

fn gradient() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
        Rgb([(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8])
    }))
}

fn png_bytes() -> Result<Vec<u8>, Box<dyn Error>> {
    let mut out = Cursor::new(Vec::new());
    gradient().write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

fn jpeg_bytes(quality: u8) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut out = Cursor::new(Vec::new());
    gradient().write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
    Ok(out.into_inner())
}

fn site(root: &Path) -> Result<Pipeline, Box<dyn Error>> {
    let images = root.join("src/images");
    fs::create_dir_all(images.join("photos"))?;
    fs::write(images.join("logo.png"), png_bytes()?)?;
    fs::write(images.join("photos/beach.jpg"), jpeg_bytes(100)?)?;
    fs::write(images.join("anim.gif"), b"GIF89a-not-really")?;

    let cfg = ConfigFileBuilder::new().with_jpeg_quality(70).build();
    Ok(Pipeline::new(
        Arc::new(cfg),
        root,
        Arc::new(RealFileSystem),
        Arc::new(NoopNotifier),
    ))
}

#[tokio::test]
async fn rerunning_on_unchanged_sources_is_byte_identical() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let p = site(dir.path())?;

    let first = p.run_image_task().await?;
    let snapshot: Vec<Vec<u8>> = first.iter().map(fs::read).collect::<Result<_, _>>()?;

    let second = p.run_image_task().await?;
    assert_eq!(first, second);
    for (path, before) in second.iter().zip(&snapshot) {
        assert_eq!(&fs::read(path)?, before, "{path:?} changed on rerun");
    }
    Ok(())
}

#[tokio::test]
async fn outputs_mirror_sources_and_never_grow() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let p = site(root)?;

    p.run_image_task().await?;

    let dest = root.join("dest/images");
    for rel in ["logo.png", "photos/beach.jpg", "anim.gif"] {
        let src = fs::read(root.join("src/images").join(rel))?;
        let out = fs::read(dest.join(rel))?;
        assert!(out.len() <= src.len(), "{rel} grew");
    }
    assert_eq!(fs::read(dest.join("anim.gif"))?, b"GIF89a-not-really");

    // Output still decodes as the same format.
    let logo = image::load_from_memory_with_format(&fs::read(dest.join("logo.png"))?, ImageFormat::Png)?;
    assert_eq!((logo.width(), logo.height()), (64, 48));
    Ok(())
}

#[test]
fn compressing_compressed_output_is_stable() -> TestResult {
    let once = compress(Path::new("a.png"), &png_bytes()?, 80)?;
    let twice = compress(Path::new("a.png"), &once, 80)?;
    assert_eq!(once, twice);
    Ok(())
}

#[tokio::test]
async fn undecodable_image_fails_the_task() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let p = site(root)?;
    fs::write(root.join("src/images/broken.png"), b"\x89PNG garbage")?;

    let err = p.run_image_task().await.unwrap_err();
    assert!(matches!(err, PipelineError::Transform { .. }), "{err:?}");
    assert!(!root.join("dest/images").exists());
    Ok(())
}
