// src/tasks/imagemin.rs

//! Built-in image compressor.
//!
//! JPEG is re-encoded as progressive JPEG at the configured quality, PNG
//! with maximum effort.
//! Everything else, and any re-encode that would not shrink the file, is
//! copied verbatim. Encoding is deterministic, so rerunning on unchanged
//! sources reproduces the same bytes.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::dispatch::SourceFile;
use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::tasks::transform::{TransformFuture, TransformOutput, Transformer};
use crate::types::Category;

#[derive(Debug, Clone)]
pub struct ImageCompressor {
    fs: Arc<dyn FileSystem>,
    jpeg_quality: u8,
}

impl ImageCompressor {
    pub fn new(fs: Arc<dyn FileSystem>, jpeg_quality: u8) -> Self {
        Self { fs, jpeg_quality }
    }

    fn compress_all(&self, sources: &[SourceFile]) -> Result<Vec<TransformOutput>> {
        let mut outputs = Vec::with_capacity(sources.len());
        for source in sources {
            let original = self.fs.read(&source.path)?;
            let contents = compress(&source.path, &original, self.jpeg_quality).map_err(|e| {
                PipelineError::transform(Category::Image, format!("{:?}: {e:#}", source.rel))
            })?;
            debug!(
                file = ?source.rel,
                before = original.len(),
                after = contents.len(),
                "image compressed"
            );
            outputs.push(TransformOutput {
                rel: source.rel.clone(),
                contents,
            });
        }
        Ok(outputs)
    }
}

impl Transformer for ImageCompressor {
    fn transform<'a>(&'a self, sources: &'a [SourceFile]) -> TransformFuture<'a> {
        let this = self.clone();
        let sources = sources.to_vec();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || this.compress_all(&sources))
                .await
                .context("image compression task panicked")?
        })
    }
}

/// Compressed form of `original`, chosen by the extension of `path`.
pub fn compress(path: &Path, original: &[u8], jpeg_quality: u8) -> AnyResult<Vec<u8>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let encoded = match ext.as_deref() {
        Some("jpg") | Some("jpeg") => Some(encode_jpeg(original, jpeg_quality)?),
        Some("png") => Some(encode_png(original)?),
        _ => None,
    };

    Ok(match encoded {
        Some(out) if out.len() < original.len() => out,
        _ => original.to_vec(),
    })
}

fn decode(bytes: &[u8], format: ImageFormat) -> AnyResult<DynamicImage> {
    image::load_from_memory_with_format(bytes, format)
        .with_context(|| format!("decoding {format:?} image"))
}

fn encode_jpeg(bytes: &[u8], quality: u8) -> AnyResult<Vec<u8>> {
    let img = decode(bytes, ImageFormat::Jpeg)?.to_rgb8();
    let width = u16::try_from(img.width()).context("JPEG wider than 65535 pixels")?;
    let height = u16::try_from(img.height()).context("JPEG taller than 65535 pixels")?;

    let mut out = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut out, quality.clamp(1, 100));
    encoder.set_progressive(true);
    encoder
        .encode(img.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)
        .context("encoding JPEG")?;
    Ok(out)
}

fn encode_png(bytes: &[u8]) -> AnyResult<Vec<u8>> {
    let img = decode(bytes, ImageFormat::Png)?;
    let mut out = Cursor::new(Vec::new());
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder).context("encoding PNG")?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient_png() -> Vec<u8> {
        let img = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]));
        let mut out = Cursor::new(Vec::new());
        // Fast, unfiltered encoding leaves room for the compressor.
        let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter);
        DynamicImage::ImageRgb8(img).write_with_encoder(encoder).unwrap();
        out.into_inner()
    }

    #[test]
    fn png_never_grows() {
        let original = gradient_png();
        let out = compress(Path::new("a.png"), &original, 80).unwrap();
        assert!(out.len() <= original.len());
        assert!(image::load_from_memory_with_format(&out, ImageFormat::Png).is_ok());
    }

    #[test]
    fn compression_is_deterministic() {
        let original = gradient_png();
        let a = compress(Path::new("a.PNG"), &original, 80).unwrap();
        let b = compress(Path::new("a.PNG"), &original, 80).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_formats_are_copied_verbatim() {
        let bytes = b"GIF89a not really".to_vec();
        assert_eq!(compress(Path::new("anim.gif"), &bytes, 80).unwrap(), bytes);
        assert_eq!(compress(Path::new("notes.txt"), &bytes, 80).unwrap(), bytes);
    }

    fn baseline_jpeg(quality: u8) -> Vec<u8> {
        let img = RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 90]));
        let mut out = Cursor::new(Vec::new());
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
        DynamicImage::ImageRgb8(img).write_with_encoder(encoder).unwrap();
        out.into_inner()
    }

    fn has_marker(bytes: &[u8], marker: u8) -> bool {
        bytes.windows(2).any(|w| w == [0xFF, marker])
    }

    #[test]
    fn jpeg_output_is_progressive() {
        let original = baseline_jpeg(100);
        assert!(has_marker(&original, 0xC0));

        let out = compress(Path::new("photo.JPG"), &original, 80).unwrap();
        assert!(out.len() < original.len());
        assert!(has_marker(&out, 0xC2), "no SOF2 marker");
        assert!(!has_marker(&out, 0xC0), "still baseline");

        let decoded = image::load_from_memory_with_format(&out, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn corrupt_png_is_an_error() {
        assert!(compress(Path::new("broken.png"), b"\x89PNG garbage", 80).is_err());
    }
}
