// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{Category, CommandMode, PathKey, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// triggered_while_running_behaviour = "queue"
///
/// [paths.style]
/// src = "src/sass/app.sass"
/// watch = "src/sass/**/*.sass"
/// dest = "dest/css"
///
/// [transform.style]
/// mode = "per_file"
/// cmd = "npx sass --style=compressed {input} {output}"
/// out_ext = "css"
/// ```
///
/// All sections are optional; anything left out falls back to the standard
/// `src/` → `dest/` layout.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub icon_font: IconFontSection,

    #[serde(default)]
    pub image: ImageSection,

    /// Per-category external command overrides, keyed by category name.
    #[serde(default)]
    pub transform: BTreeMap<String, TransformConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"queue"` (default) or `"skip"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Ignore watch events whose file content hash did not change.
    #[serde(default = "default_true")]
    pub skip_unchanged: bool,
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            skip_unchanged: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// `[server]` section used by the `browser-sync` task.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Directory served as the site root.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port; the next free port is used if taken.
    #[serde(default = "default_port")]
    pub port: u16,

    /// WebSocket port for reload signals.
    #[serde(default = "default_reload_port")]
    pub reload_port: u16,
}

fn default_base_dir() -> String {
    "dest".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_reload_port() -> u16 {
    35729
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            host: default_host(),
            port: default_port(),
            reload_port: default_reload_port(),
        }
    }
}

/// `[paths]` section. Every entry is optional and merged field by field with
/// the built-in default for that key.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PathsSection {
    #[serde(default)]
    pub script: Option<RawPathEntry>,
    #[serde(default)]
    pub style: Option<RawPathEntry>,
    #[serde(default)]
    pub template: Option<RawPathEntry>,
    #[serde(default)]
    pub image: Option<RawPathEntry>,
    #[serde(default)]
    pub icon_source: Option<RawPathEntry>,
    #[serde(default)]
    pub icon_stylesheet: Option<RawPathEntry>,
}

impl PathsSection {
    pub fn get(&self, key: PathKey) -> Option<&RawPathEntry> {
        match key {
            PathKey::Script => self.script.as_ref(),
            PathKey::Style => self.style.as_ref(),
            PathKey::Template => self.template.as_ref(),
            PathKey::Image => self.image.as_ref(),
            PathKey::IconSource => self.icon_source.as_ref(),
            PathKey::IconStylesheet => self.icon_stylesheet.as_ref(),
        }
    }

    pub fn get_mut(&mut self, key: PathKey) -> &mut Option<RawPathEntry> {
        match key {
            PathKey::Script => &mut self.script,
            PathKey::Style => &mut self.style,
            PathKey::Template => &mut self.template,
            PathKey::Image => &mut self.image,
            PathKey::IconSource => &mut self.icon_source,
            PathKey::IconStylesheet => &mut self.icon_stylesheet,
        }
    }
}

/// `[paths.<key>]` as written in the file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPathEntry {
    pub src: Option<String>,
    /// Pattern watched for changes; defaults to `src`.
    pub watch: Option<String>,
    pub dest: Option<String>,
}

/// Resolved source/watch/destination mapping for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub src: String,
    pub watch: String,
    pub dest: String,
}

/// Built-in mapping for a key: the conventional `src/` → `dest/` layout.
pub fn default_path_entry(key: PathKey) -> PathEntry {
    let (src, watch, dest) = match key {
        PathKey::Script => ("src/app/**/*.js", None, "dest/js"),
        PathKey::Style => ("src/sass/app.sass", Some("src/sass/**/*.sass"), "dest/css"),
        PathKey::Template => ("src/html/**/*.pug", None, "dest"),
        PathKey::Image => ("src/images/**/*.*", None, "dest/images"),
        PathKey::IconSource => ("src/assets/icons/*.svg", None, "../fonts"),
        PathKey::IconStylesheet => ("src/assets/icons/iconfont.css", None, "dest/css"),
    };
    PathEntry {
        src: src.to_string(),
        watch: watch.unwrap_or(src).to_string(),
        dest: dest.to_string(),
    }
}

/// Read-only mapping from every [`PathKey`] to its resolved entry.
///
/// Built once during validation; there is no way to mutate it afterwards.
#[derive(Debug, Clone)]
pub struct PathConfig {
    entries: BTreeMap<PathKey, PathEntry>,
}

impl PathConfig {
    pub(crate) fn new_unchecked(entries: BTreeMap<PathKey, PathEntry>) -> Self {
        Self { entries }
    }

    pub fn entry(&self, key: PathKey) -> &PathEntry {
        // Validation inserts every key.
        &self.entries[&key]
    }

    pub fn src(&self, key: PathKey) -> &str {
        &self.entry(key).src
    }

    pub fn watch(&self, key: PathKey) -> &str {
        &self.entry(key).watch
    }

    pub fn dest(&self, key: PathKey) -> &str {
        &self.entry(key).dest
    }

    pub fn iter(&self) -> impl Iterator<Item = (PathKey, &PathEntry)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}

/// `[icon_font]` section.
///
/// The stylesheet template (`[paths.icon_stylesheet].src`) uses `{{fontName}}`,
/// `{{fontPath}}`, `{{fontSrc}}`, `{{className}}` and a
/// `{{#glyphs}}{{name}} {{codepoint}}{{/glyphs}}` block. Lodash `<%= %>`
/// templates are not rendered.
///
/// Only an SVG font is generated natively. For TTF/WOFF, add a converter:
///
/// ```toml
/// [transform.icon_font]
/// mode = "per_file"
/// cmd = "npx svg2ttf {input} {output} && npx ttf2woff {output} {output_dir}/iconfont.woff"
/// out_ext = "ttf"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct IconFontSection {
    #[serde(default = "default_font_name")]
    pub font_name: String,

    /// Prefix of the generated CSS classes (`.icon-<glyph>`).
    #[serde(default = "default_class_name")]
    pub class_name: String,

    /// Codepoint assigned to the first glyph; the rest follow sequentially.
    #[serde(default = "default_start_codepoint")]
    pub start_codepoint: u32,

    #[serde(default = "default_font_height")]
    pub font_height: u32,
}

fn default_font_name() -> String {
    "iconfont".to_string()
}

fn default_class_name() -> String {
    "icon".to_string()
}

fn default_start_codepoint() -> u32 {
    0xEA01
}

fn default_font_height() -> u32 {
    1000
}

impl Default for IconFontSection {
    fn default() -> Self {
        Self {
            font_name: default_font_name(),
            class_name: default_class_name(),
            start_codepoint: default_start_codepoint(),
            font_height: default_font_height(),
        }
    }
}

/// `[image]` section for the built-in compressor.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageSection {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_jpeg_quality() -> u8 {
    80
}

impl Default for ImageSection {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// `[transform.<category>]`: external command used for a category.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TransformConfig {
    #[serde(default)]
    pub mode: CommandMode,

    /// Shell command with `{inputs}`, `{input}`, `{output}`, `{output_dir}`
    /// and `{out_dir}` placeholders.
    pub cmd: String,

    /// Extension of per-file outputs (`"css"`, `"html"`). Keeps the source
    /// extension when unset.
    #[serde(default)]
    pub out_ext: Option<String>,
}

/// Built-in external command for categories that have one.
///
/// Images are compressed natively unless overridden. An icon-font command,
/// if configured, converts the generated SVG font into further formats.
pub fn default_transform(category: Category) -> Option<TransformConfig> {
    match category {
        Category::Script => Some(TransformConfig {
            mode: CommandMode::Batch,
            cmd: "npx esbuild {inputs} --bundle --minify --outdir={out_dir}".to_string(),
            out_ext: None,
        }),
        Category::Style => Some(TransformConfig {
            mode: CommandMode::PerFile,
            cmd: "npx sass --no-source-map --style=compressed {input} {output}".to_string(),
            out_ext: Some("css".to_string()),
        }),
        Category::Template => Some(TransformConfig {
            mode: CommandMode::PerFile,
            cmd: "npx pug --silent {input} --out {output_dir}".to_string(),
            out_ext: Some("html".to_string()),
        }),
        Category::Image | Category::IconFont => None,
    }
}

/// Validated configuration.
///
/// Constructed via `TryFrom<RawConfigFile>`; read-only afterwards.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    server: ServerSection,
    paths: PathConfig,
    icon_font: IconFontSection,
    image: ImageSection,
    transforms: BTreeMap<Category, TransformConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        server: ServerSection,
        paths: PathConfig,
        icon_font: IconFontSection,
        image: ImageSection,
        transforms: BTreeMap<Category, TransformConfig>,
    ) -> Self {
        Self {
            config,
            server,
            paths,
            icon_font,
            image,
            transforms,
        }
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.config.triggered_while_running_behaviour
    }

    pub fn skip_unchanged(&self) -> bool {
        self.config.skip_unchanged
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn paths(&self) -> &PathConfig {
        &self.paths
    }

    pub fn icon_font(&self) -> &IconFontSection {
        &self.icon_font
    }

    pub fn image(&self) -> &ImageSection {
        &self.image
    }

    /// External command for a category, if it is not handled natively.
    pub fn transform(&self, category: Category) -> Option<&TransformConfig> {
        self.transforms.get(&category)
    }
}
