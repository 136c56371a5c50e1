// src/tasks/iconfont/sinks.rs

//! The two consumers of a generated font.

use std::fmt::Debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::tasks::dest::DestWriter;

use super::font::GeneratedFont;
use super::stylesheet::{has_foreign_syntax, render_stylesheet, StylesheetContext, DEFAULT_TEMPLATE};

pub type SinkFuture = Pin<Box<dyn Future<Output = Result<Vec<PathBuf>>> + Send + 'static>>;

/// Consumer of the producer's output. Each sink runs on its own Tokio task,
/// so the returned future owns everything it needs.
pub trait IconSink: Send + Sync + Debug {
    /// Write this sink's files; returns the written paths.
    fn write(&self, font: Arc<GeneratedFont>) -> SinkFuture;
}

/// Renders the icon stylesheet template into the stylesheet destination.
#[derive(Debug, Clone)]
pub struct StylesheetSink {
    fs: Arc<dyn FileSystem>,
    template: PathBuf,
    writer: DestWriter,
    /// Prefix of the font URL inside the stylesheet, ending in `/`.
    font_path: String,
    class_name: String,
}

impl StylesheetSink {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        template: impl Into<PathBuf>,
        writer: DestWriter,
        font_path: impl Into<String>,
        class_name: impl Into<String>,
    ) -> Self {
        Self {
            fs,
            template: template.into(),
            writer,
            font_path: font_path.into(),
            class_name: class_name.into(),
        }
    }
}

impl IconSink for StylesheetSink {
    fn write(&self, font: Arc<GeneratedFont>) -> SinkFuture {
        let this = self.clone();
        Box::pin(async move {
            let template = if this.fs.is_file(&this.template) {
                let template = this.fs.read_to_string(&this.template)?;
                if has_foreign_syntax(&template) {
                    warn!(
                        template = ?this.template,
                        "stylesheet template contains `<%` tags; only {{{{var}}}} and {{{{#glyphs}}}} placeholders are rendered"
                    );
                }
                template
            } else {
                debug!(template = ?this.template, "no stylesheet template; using built-in one");
                DEFAULT_TEMPLATE.to_string()
            };

            let font_files = font.file_names();
            let css = render_stylesheet(
                &template,
                &StylesheetContext {
                    font_name: &font.font_name,
                    font_path: &this.font_path,
                    class_name: &this.class_name,
                    font_files: &font_files,
                    glyphs: &font.glyphs,
                },
            );

            let file_name = this
                .template
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("{}.css", font.font_name));

            let path = this.writer.write(Path::new(&file_name), css.as_bytes())?;
            Ok(vec![path])
        })
    }
}

/// Writes the SVG font and every converted format into the shared font
/// directory.
#[derive(Debug, Clone)]
pub struct FontSink {
    writer: DestWriter,
}

impl FontSink {
    pub fn new(writer: DestWriter) -> Self {
        Self { writer }
    }
}

impl IconSink for FontSink {
    fn write(&self, font: Arc<GeneratedFont>) -> SinkFuture {
        let writer = self.writer.clone();
        Box::pin(async move {
            let mut written = Vec::with_capacity(font.converted.len() + 1);
            for file in &font.converted {
                written.push(writer.write(&file.rel, &file.contents)?);
            }
            written.push(writer.write(Path::new(&font.svg_file_name()), font.svg.as_bytes())?);
            Ok(written)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::tasks::iconfont::glyphs::Glyph;

    fn font() -> Arc<GeneratedFont> {
        Arc::new(GeneratedFont {
            font_name: "iconfont".to_string(),
            glyphs: vec![Glyph {
                name: "home".to_string(),
                codepoint: 0xEA01,
                source: PathBuf::from("src/assets/icons/home.svg"),
            }],
            svg: "<svg/>".to_string(),
            converted: Vec::new(),
        })
    }

    #[tokio::test]
    async fn stylesheet_uses_project_template_and_its_file_name() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "src/assets/icons/iconfont.css",
            b"{{#glyphs}}.{{className}}-{{name}}{}{{/glyphs}}".to_vec(),
        );
        let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
        let sink = StylesheetSink::new(
            Arc::clone(&shared),
            "src/assets/icons/iconfont.css",
            DestWriter::new(shared, "dest/css"),
            "../fonts/",
            "icon",
        );

        let written = sink.write(font()).await.unwrap();
        assert_eq!(written, vec![PathBuf::from("dest/css/iconfont.css")]);
        assert_eq!(fs.contents("dest/css/iconfont.css"), Some(b".icon-home{}".to_vec()));
    }

    #[tokio::test]
    async fn font_sink_writes_converted_formats_before_svg() {
        use crate::tasks::transform::TransformOutput;

        let fs = MockFileSystem::new();
        let sink = FontSink::new(DestWriter::new(Arc::new(fs.clone()), "../fonts"));
        let mut font = (*font()).clone();
        font.converted = vec![TransformOutput {
            rel: PathBuf::from("iconfont.ttf"),
            contents: b"ttf".to_vec(),
        }];

        let written = sink.write(Arc::new(font)).await.unwrap();
        assert_eq!(
            written,
            vec![PathBuf::from("../fonts/iconfont.ttf"), PathBuf::from("../fonts/iconfont.svg")]
        );
        assert_eq!(fs.contents("../fonts/iconfont.ttf"), Some(b"ttf".to_vec()));
    }

    #[tokio::test]
    async fn font_sink_writes_svg_font() {
        let fs = MockFileSystem::new();
        let sink = FontSink::new(DestWriter::new(Arc::new(fs.clone()), "../fonts"));
        let written = sink.write(font()).await.unwrap();
        assert_eq!(written, vec![PathBuf::from("../fonts/iconfont.svg")]);
        assert_eq!(fs.contents("../fonts/iconfont.svg"), Some(b"<svg/>".to_vec()));
    }
}
