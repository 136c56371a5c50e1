// src/dispatch/patterns.rs

use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::config::PathConfig;
use crate::fs::FileSystem;
use crate::types::PathKey;

/// A source file selected by a category's pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as seen by the filesystem (root joined with the match).
    pub path: PathBuf,
    /// Path relative to the pattern's base directory; outputs mirror it.
    pub rel: PathBuf,
}

/// Literal directory prefix of a pattern, i.e. everything before the first
/// component containing a glob metacharacter.
///
/// A pattern without metacharacters names a single file, whose parent is the
/// base: `src/sass/app.sass` → `src/sass`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let mut had_glob = false;

    for part in pattern.split('/') {
        if part.contains(['*', '?', '[', '{']) {
            had_glob = true;
            break;
        }
        base.push(part);
    }

    if !had_glob {
        base.pop();
    }
    base
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?;
    Ok(glob.compile_matcher())
}

/// Forward-slash path of `path` relative to `root`, without `.` components.
pub fn root_relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

/// Collect every file under `root` matching `pattern`, sorted by path.
pub fn collect_sources(fs: &dyn FileSystem, root: &Path, pattern: &str) -> Result<Vec<SourceFile>> {
    let matcher = compile(pattern)?;
    let base = glob_base(pattern);
    let start = if base.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(&base)
    };

    let mut files = Vec::new();
    if !fs.is_dir(&start) {
        return Ok(files);
    }

    let mut stack = vec![start.clone()];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                let Some(rel_str) = root_relative(root, &path) else {
                    continue;
                };
                if matcher.is_match(&rel_str) {
                    let rel = path
                        .strip_prefix(&start)
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|_| PathBuf::from(&rel_str));
                    files.push(SourceFile { path, rel });
                }
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Union of the watch patterns of every watched path entry.
#[derive(Clone)]
pub struct WatchSet {
    set: GlobSet,
    patterns: Vec<String>,
}

impl fmt::Debug for WatchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl WatchSet {
    pub fn from_paths(paths: &PathConfig) -> Result<Self> {
        let patterns: Vec<String> = PathKey::ALL
            .iter()
            .filter(|k| k.is_watched())
            .map(|k| paths.watch(*k).to_string())
            .collect();
        Self::new(patterns)
    }

    pub fn new(patterns: Vec<String>) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pat in &patterns {
            let glob = GlobBuilder::new(pat)
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid glob pattern: {pat}"))?;
            builder.add(glob);
        }
        Ok(Self {
            set: builder.build()?,
            patterns,
        })
    }

    /// True if a root-relative, forward-slash path is watched.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
