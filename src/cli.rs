// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::Category;

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Build front-end assets and rebuild them on change with live reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If the default file does not exist, built-in defaults are used.
    #[arg(long, value_name = "PATH", default_value = "Assetpipe.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the path mapping, but don't run anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Task to run. Defaults to `default`.
    #[command(subcommand)]
    pub task: Option<TaskCommand>,
}

impl CliArgs {
    /// The task to run, falling back to `default`.
    pub fn task(&self) -> TaskCommand {
        self.task.unwrap_or(TaskCommand::Default)
    }
}

/// Named tasks, mirroring the task names of the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum TaskCommand {
    /// Bundle scripts.
    #[command(name = "minifyjs")]
    MinifyJs,
    /// Compile the style entry with compressed output.
    #[command(name = "minifysass")]
    MinifySass,
    /// Render templates to HTML.
    #[command(name = "minifyHTML")]
    MinifyHtml,
    /// Compress images.
    #[command(name = "imagemin")]
    Imagemin,
    /// Generate the icon font and its stylesheet.
    #[command(name = "svgToIconfont")]
    SvgToIconfont,
    /// Run script, style, template and image tasks once.
    #[command(name = "minify")]
    Minify,
    /// Serve the output root with live reload.
    #[command(name = "browser-sync")]
    BrowserSync,
    /// Start `browser-sync`, then rebuild on every change.
    #[command(name = "watch")]
    Watch,
    /// `minify`, `watch` and `svgToIconfont`.
    #[command(name = "default")]
    Default,
}

impl TaskCommand {
    /// Categories this task triggers at startup.
    pub fn initial_categories(self) -> Vec<Category> {
        match self {
            TaskCommand::MinifyJs => vec![Category::Script],
            TaskCommand::MinifySass => vec![Category::Style],
            TaskCommand::MinifyHtml => vec![Category::Template],
            TaskCommand::Imagemin => vec![Category::Image],
            TaskCommand::SvgToIconfont => vec![Category::IconFont],
            TaskCommand::Minify => MINIFY_CATEGORIES.to_vec(),
            TaskCommand::BrowserSync | TaskCommand::Watch => Vec::new(),
            TaskCommand::Default => Category::ALL.to_vec(),
        }
    }

    /// Whether the dev server (static files + reload channel) is started.
    pub fn serves(self) -> bool {
        matches!(
            self,
            TaskCommand::BrowserSync | TaskCommand::Watch | TaskCommand::Default
        )
    }

    /// Whether the file watcher is started.
    pub fn watches(self) -> bool {
        matches!(self, TaskCommand::Watch | TaskCommand::Default)
    }

    /// One-shot tasks exit once every triggered category has finished.
    pub fn exits_when_idle(self) -> bool {
        !self.serves()
    }
}

/// Categories of the aggregate `minify` task.
pub const MINIFY_CATEGORIES: [Category; 4] = [
    Category::Script,
    Category::Style,
    Category::Template,
    Category::Image,
];

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_names_parse_with_original_spelling() {
        let args = CliArgs::try_parse_from(["assetpipe", "minifyHTML"]).unwrap();
        assert_eq!(args.task(), TaskCommand::MinifyHtml);

        let args = CliArgs::try_parse_from(["assetpipe", "browser-sync"]).unwrap();
        assert_eq!(args.task(), TaskCommand::BrowserSync);

        let args = CliArgs::try_parse_from(["assetpipe", "svgToIconfont", "--dry-run"]).unwrap();
        assert_eq!(args.task(), TaskCommand::SvgToIconfont);
        assert!(args.dry_run);
    }

    #[test]
    fn no_task_means_default() {
        let args = CliArgs::try_parse_from(["assetpipe"]).unwrap();
        assert_eq!(args.task(), TaskCommand::Default);
        assert!(args.task().watches());
        assert_eq!(args.task().initial_categories().len(), 5);
    }

    #[test]
    fn minify_is_one_shot_over_four_categories() {
        let task = TaskCommand::Minify;
        assert!(task.exits_when_idle());
        assert!(!task.serves());
        assert_eq!(task.initial_categories(), MINIFY_CATEGORIES.to_vec());
    }

    #[test]
    fn watch_serves_before_watching() {
        assert!(TaskCommand::Watch.serves());
        assert!(TaskCommand::Watch.watches());
        assert!(TaskCommand::Watch.initial_categories().is_empty());
        assert!(!TaskCommand::BrowserSync.watches());
    }
}
