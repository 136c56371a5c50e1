// src/tasks/transform.rs

//! Transformers: what turns a category's sources into output files.
//!
//! Bundling, style compilation and template rendering run as external shell
//! commands against a staging directory. Outputs are collected from staging
//! and handed back to the pipeline, which writes them under the destination;
//! a failing command therefore never leaves partial output behind.

use std::fmt::Debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::TransformConfig;
use crate::dispatch::SourceFile;
use crate::errors::{PipelineError, Result};
use crate::types::{Category, CommandMode};

/// One file produced by a transformer, relative to the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub rel: PathBuf,
    pub contents: Vec<u8>,
}

pub type TransformFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<TransformOutput>>> + Send + 'a>>;

/// Turns source files into output files without touching the destination.
pub trait Transformer: Send + Sync + Debug {
    fn transform<'a>(&'a self, sources: &'a [SourceFile]) -> TransformFuture<'a>;
}

/// External shell command configured under `[transform.<category>]`.
#[derive(Debug, Clone)]
pub struct CommandTransformer {
    category: Category,
    config: TransformConfig,
    /// Working directory of the command (the project root).
    root: PathBuf,
}

impl CommandTransformer {
    pub fn new(category: Category, config: TransformConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            category,
            config,
            root: root.into(),
        }
    }

    async fn run_batch(&self, sources: &[SourceFile], staging: &Path) -> Result<()> {
        let inputs: Vec<String> = sources
            .iter()
            .map(|s| shell_quote(&s.path.to_string_lossy()))
            .collect();

        let cmd = self
            .config
            .cmd
            .replace("{inputs}", &inputs.join(" "))
            .replace("{out_dir}", &shell_quote(&staging.to_string_lossy()));

        self.run_shell(&cmd).await
    }

    async fn run_per_file(&self, sources: &[SourceFile], staging: &Path) -> Result<()> {
        for source in sources {
            let output = staging.join(self.output_rel(&source.rel));
            let output_dir = output.parent().unwrap_or(staging).to_path_buf();
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("creating staging dir {:?}", output_dir))?;

            let cmd = self
                .config
                .cmd
                .replace("{input}", &shell_quote(&source.path.to_string_lossy()))
                .replace("{output_dir}", &shell_quote(&output_dir.to_string_lossy()))
                .replace("{output}", &shell_quote(&output.to_string_lossy()))
                .replace("{out_dir}", &shell_quote(&staging.to_string_lossy()));

            self.run_shell(&cmd).await?;
        }
        Ok(())
    }

    /// Output location of a per-file source, relative to the destination.
    fn output_rel(&self, rel: &Path) -> PathBuf {
        match &self.config.out_ext {
            Some(ext) => rel.with_extension(ext),
            None => rel.to_path_buf(),
        }
    }

    async fn run_shell(&self, cmd: &str) -> Result<()> {
        info!(category = %self.category, cmd = %cmd, "running transform command");

        let mut command = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(cmd);
            c
        };

        command
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = command
            .output()
            .await
            .with_context(|| format!("spawning {} transform command", self.category))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(category = %self.category, "stdout: {}", line);
        }

        if output.status.success() {
            return Ok(());
        }

        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!(
            category = %self.category,
            exit_code = code,
            stderr = %stderr,
            "transform command failed"
        );
        Err(PipelineError::transform(
            self.category,
            if stderr.is_empty() {
                format!("command exited with code {code}")
            } else {
                format!("command exited with code {code}: {stderr}")
            },
        ))
    }
}

impl Transformer for CommandTransformer {
    fn transform<'a>(&'a self, sources: &'a [SourceFile]) -> TransformFuture<'a> {
        Box::pin(async move {
            let staging = tempfile::Builder::new()
                .prefix("assetpipe-")
                .tempdir()
                .context("creating staging directory")?;

            match self.config.mode {
                CommandMode::Batch => self.run_batch(sources, staging.path()).await?,
                CommandMode::PerFile => self.run_per_file(sources, staging.path()).await?,
            }

            let outputs = collect_staged(staging.path())?;
            debug!(category = %self.category, outputs = outputs.len(), "collected staged outputs");
            Ok(outputs)
        })
    }
}

/// Read every file below `staging`, sorted by relative path.
fn collect_staged(staging: &Path) -> Result<Vec<TransformOutput>> {
    let mut outputs = Vec::new();
    let mut stack = vec![staging.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries =
            std::fs::read_dir(&dir).with_context(|| format!("reading staging dir {:?}", dir))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let rel = path
                .strip_prefix(staging)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| PathBuf::from(path.file_name().unwrap_or_default()));
            let contents =
                std::fs::read(&path).with_context(|| format!("reading staged file {:?}", path))?;
            outputs.push(TransformOutput { rel, contents });
        }
    }

    outputs.sort_by(|a, b| a.rel.cmp(&b.rel));
    Ok(outputs)
}

/// Quote one argument for the platform shell.
pub fn shell_quote(arg: &str) -> String {
    if cfg!(windows) {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
