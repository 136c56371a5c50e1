// src/tasks/pipeline.rs

//! The five category tasks.
//!
//! Every task follows the same shape: collect the sources matched by the
//! category's pattern, transform them, write the results under the
//! category's destination and tell reload listeners what changed. Nothing is
//! written when the transform fails.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::dispatch::patterns::root_relative;
use crate::dispatch::{collect_sources, SourceFile};
use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::reload::{ReloadNotifier, ReloadSignal};
use crate::tasks::dest::DestWriter;
use crate::tasks::iconfont::{
    assign_codepoints, distribute, generate_font, FontSink, GeneratedFont, IconFontSinks,
    StylesheetSink,
};
use crate::tasks::imagemin::ImageCompressor;
use crate::tasks::transform::{CommandTransformer, TransformOutput, Transformer};
use crate::types::{Category, PathKey};

pub struct Pipeline {
    config: Arc<ConfigFile>,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    notifier: Arc<dyn ReloadNotifier>,
    transformers: BTreeMap<Category, Arc<dyn Transformer>>,
    icon_sinks: IconFontSinks,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("root", &self.root)
            .field("transformers", &self.transformers)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Pipeline rooted at `root` (the directory the config file lives in),
    /// with transformers and icon sinks derived from `config`.
    pub fn new(
        config: Arc<ConfigFile>,
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        notifier: Arc<dyn ReloadNotifier>,
    ) -> Self {
        let root = root.into();

        let mut transformers: BTreeMap<Category, Arc<dyn Transformer>> = BTreeMap::new();
        for category in Category::ALL {
            if let Some(t) = config.transform(category) {
                let command = CommandTransformer::new(category, t.clone(), &root);
                transformers.insert(category, Arc::new(command));
            }
        }
        if !transformers.contains_key(&Category::Image) {
            let compressor = ImageCompressor::new(Arc::clone(&fs), config.image().jpeg_quality);
            transformers.insert(Category::Image, Arc::new(compressor));
        }

        let icon_sinks = default_icon_sinks(&config, &root, &fs);

        Self {
            config,
            root,
            fs,
            notifier,
            transformers,
            icon_sinks,
        }
    }

    /// Replace the transformer of one category.
    pub fn with_transformer(mut self, category: Category, transformer: Arc<dyn Transformer>) -> Self {
        self.transformers.insert(category, transformer);
        self
    }

    /// Replace the icon-font consumers.
    pub fn with_icon_sinks(mut self, sinks: IconFontSinks) -> Self {
        self.icon_sinks = sinks;
        self
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute destination directory of a path key.
    pub fn dest_dir(&self, key: PathKey) -> PathBuf {
        self.root.join(self.config.paths().dest(key))
    }

    /// Run one category. Returns the written files.
    pub async fn run(&self, category: Category) -> Result<Vec<PathBuf>> {
        match category {
            Category::Script => self.run_script_task().await,
            Category::Style => self.run_style_task().await,
            Category::Template => self.run_template_task().await,
            Category::Image => self.run_image_task().await,
            Category::IconFont => self.run_icon_font_task().await,
        }
    }

    /// Bundle every script source into the script destination; reload the
    /// page once.
    pub async fn run_script_task(&self) -> Result<Vec<PathBuf>> {
        let written = self.transform_and_write(Category::Script).await?;
        if !written.is_empty() {
            self.notifier.notify(ReloadSignal::Reload);
        }
        Ok(written)
    }

    /// Compile the style entry file; inject the new stylesheet in place.
    pub async fn run_style_task(&self) -> Result<Vec<PathBuf>> {
        let written = self.transform_and_write(Category::Style).await?;
        if !written.is_empty() {
            self.notifier.notify(ReloadSignal::InjectStyles {
                paths: self.display_paths(&written),
            });
        }
        Ok(written)
    }

    /// Render every template into the HTML destination.
    pub async fn run_template_task(&self) -> Result<Vec<PathBuf>> {
        let written = self.transform_and_write(Category::Template).await?;
        self.notify_changed(&written);
        Ok(written)
    }

    /// Compress every image into the image destination.
    pub async fn run_image_task(&self) -> Result<Vec<PathBuf>> {
        let written = self.transform_and_write(Category::Image).await?;
        self.notify_changed(&written);
        Ok(written)
    }

    /// Generate the icon font and hand it to both sinks.
    pub async fn run_icon_font_task(&self) -> Result<Vec<PathBuf>> {
        let sources = self.sources(PathKey::IconSource)?;
        if sources.is_empty() {
            info!(category = %Category::IconFont, "no icon sources matched; nothing to do");
            return Ok(Vec::new());
        }

        let settings = self.config.icon_font().clone();
        let glyphs = assign_codepoints(&sources, settings.start_codepoint);
        let fs = Arc::clone(&self.fs);
        let mut font =
            tokio::task::spawn_blocking(move || generate_font(fs.as_ref(), glyphs, &settings))
                .await
                .map_err(anyhow::Error::from)?
                .map_err(|e| PipelineError::transform(Category::IconFont, format!("{e:#}")))?;

        info!(glyphs = font.glyphs.len(), "icon font generated");

        if let Some(converter) = self.transformers.get(&Category::IconFont) {
            font.converted = convert_font(converter.as_ref(), &font).await?;
            info!(files = ?font.file_names(), "icon font converted");
        }

        let outputs = distribute(font, &self.icon_sinks).await?;
        self.notifier.notify(ReloadSignal::InjectStyles {
            paths: self.display_paths(&outputs.stylesheet),
        });

        let mut written = outputs.stylesheet;
        written.extend(outputs.fonts);
        Ok(written)
    }

    fn sources(&self, key: PathKey) -> Result<Vec<SourceFile>> {
        Ok(collect_sources(
            self.fs.as_ref(),
            &self.root,
            self.config.paths().src(key),
        )?)
    }

    async fn transform_and_write(&self, category: Category) -> Result<Vec<PathBuf>> {
        let key = PathKey::from(category);
        let sources = self.sources(key)?;
        if sources.is_empty() {
            info!(%category, pattern = self.config.paths().src(key), "no sources matched; nothing to do");
            return Ok(Vec::new());
        }

        let Some(transformer) = self.transformers.get(&category) else {
            return Err(PipelineError::transform(category, "no transformer configured"));
        };

        let outputs = transformer.transform(&sources).await?;
        if outputs.is_empty() {
            warn!(%category, "transform produced no output");
        }

        // Validate every target before writing any of them.
        let writer = DestWriter::new(Arc::clone(&self.fs), self.dest_dir(key));
        for output in &outputs {
            writer.target(&output.rel)?;
        }

        let mut written = Vec::with_capacity(outputs.len());
        for output in outputs {
            written.push(writer.write(&output.rel, &output.contents)?);
        }

        info!(%category, sources = sources.len(), outputs = written.len(), "task finished");
        Ok(written)
    }

    fn notify_changed(&self, written: &[PathBuf]) {
        if !written.is_empty() {
            self.notifier.notify(ReloadSignal::Changed {
                paths: self.display_paths(written),
            });
        }
    }

    /// Root-relative, forward-slash form of written paths for reload clients.
    fn display_paths(&self, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| {
                root_relative(&self.root, p)
                    .unwrap_or_else(|| p.to_string_lossy().replace('\\', "/"))
            })
            .collect()
    }
}

/// Run the `[transform.icon_font]` command on the SVG font. The SVG itself is
/// staged on disk because the command reads a real file.
async fn convert_font(converter: &dyn Transformer, font: &GeneratedFont) -> Result<Vec<TransformOutput>> {
    let staging = tempfile::Builder::new()
        .prefix("assetpipe-font-")
        .tempdir()
        .context("creating font staging directory")?;

    let svg_name = font.svg_file_name();
    let svg_path = staging.path().join(&svg_name);
    std::fs::write(&svg_path, &font.svg).with_context(|| format!("staging {:?}", svg_path))?;

    let source = SourceFile {
        path: svg_path,
        rel: PathBuf::from(&svg_name),
    };
    let outputs = converter.transform(std::slice::from_ref(&source)).await?;

    let converted: Vec<TransformOutput> = outputs
        .into_iter()
        .filter(|o| o.rel != Path::new(&svg_name))
        .collect();
    if converted.is_empty() {
        warn!("icon font converter produced no files besides the SVG font");
    }
    Ok(converted)
}

fn default_icon_sinks(config: &ConfigFile, root: &Path, fs: &Arc<dyn FileSystem>) -> IconFontSinks {
    let paths = config.paths();
    let font_dest = paths.dest(PathKey::IconSource);

    let stylesheet = StylesheetSink::new(
        Arc::clone(fs),
        root.join(paths.src(PathKey::IconStylesheet)),
        DestWriter::new(Arc::clone(fs), root.join(paths.dest(PathKey::IconStylesheet))),
        format!("{}/", font_dest.trim_end_matches('/')),
        config.icon_font().class_name.clone(),
    );
    let fonts = FontSink::new(DestWriter::new(Arc::clone(fs), root.join(font_dest)));

    IconFontSinks {
        stylesheet: Arc::new(stylesheet),
        fonts: Arc::new(fonts),
    }
}
