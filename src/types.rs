// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Asset category handled by one pipeline task.
///
/// The icon stylesheet is not a task of its own: it is one of the two outputs
/// of the icon-font task, but it still has its own source/destination mapping
/// (see [`PathKey`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Script,
    Style,
    Template,
    Image,
    IconFont,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Script,
        Category::Style,
        Category::Template,
        Category::Image,
        Category::IconFont,
    ];

    /// Name of the CLI task that runs this category on its own.
    pub fn task_name(self) -> &'static str {
        match self {
            Category::Script => "minifyjs",
            Category::Style => "minifysass",
            Category::Template => "minifyHTML",
            Category::Image => "imagemin",
            Category::IconFont => "svgToIconfont",
        }
    }

    /// Config key used for this category in `[transform.<key>]`.
    pub fn key(self) -> &'static str {
        match self {
            Category::Script => "script",
            Category::Style => "style",
            Category::Template => "template",
            Category::Image => "image",
            Category::IconFont => "icon_font",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "script" => Ok(Category::Script),
            "style" => Ok(Category::Style),
            "template" => Ok(Category::Template),
            "image" => Ok(Category::Image),
            "icon_font" | "iconfont" => Ok(Category::IconFont),
            other => Err(format!(
                "unknown category: {other} (expected script, style, template, image or icon_font)"
            )),
        }
    }
}

/// Key of one entry in the `[paths]` mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathKey {
    Script,
    Style,
    Template,
    Image,
    IconSource,
    IconStylesheet,
}

impl PathKey {
    pub const ALL: [PathKey; 6] = [
        PathKey::Script,
        PathKey::Style,
        PathKey::Template,
        PathKey::Image,
        PathKey::IconSource,
        PathKey::IconStylesheet,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PathKey::Script => "script",
            PathKey::Style => "style",
            PathKey::Template => "template",
            PathKey::Image => "image",
            PathKey::IconSource => "icon_source",
            PathKey::IconStylesheet => "icon_stylesheet",
        }
    }

    /// Whether changes under this entry's watch pattern feed the watch loop.
    pub fn is_watched(self) -> bool {
        !matches!(self, PathKey::IconStylesheet)
    }
}

impl From<Category> for PathKey {
    fn from(category: Category) -> Self {
        match category {
            Category::Script => PathKey::Script,
            Category::Style => PathKey::Style,
            Category::Template => PathKey::Template,
            Category::Image => PathKey::Image,
            Category::IconFont => PathKey::IconSource,
        }
    }
}

/// Behaviour when a category is triggered while a run of the same category
/// is still in flight.
///
/// - `Queue`: remember the trigger in a single pending slot and run once more
///   when the current run finishes. Repeated triggers coalesce.
/// - `Skip`: drop the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Skip,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "skip" => Ok(TriggerWhileRunningBehaviour::Skip),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"skip\")"
            )),
        }
    }
}

/// How an external command is invoked for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommandMode {
    /// One invocation with every source file (`{inputs}`).
    #[default]
    Batch,
    /// One invocation per source file (`{input}`, `{output}`, `{output_dir}`).
    PerFile,
}
