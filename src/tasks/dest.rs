// src/tasks/dest.rs

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;

/// Writes task output below one destination directory and nowhere else.
#[derive(Debug, Clone)]
pub struct DestWriter {
    fs: Arc<dyn FileSystem>,
    dest: PathBuf,
}

impl DestWriter {
    pub fn new(fs: Arc<dyn FileSystem>, dest: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dest: dest.into(),
        }
    }

    /// Full path `rel` would be written to, or `OutsideDestination` if `rel`
    /// is absolute or climbs out with `..`.
    pub fn target(&self, rel: &Path) -> Result<PathBuf> {
        let escapes = rel.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if escapes || rel.as_os_str().is_empty() {
            return Err(PipelineError::OutsideDestination {
                path: rel.to_path_buf(),
                dest: self.dest.clone(),
            });
        }
        Ok(self.dest.join(rel))
    }

    pub fn write(&self, rel: &Path, contents: &[u8]) -> Result<PathBuf> {
        let target = self.target(rel)?;
        self.fs.write(&target, contents)?;
        debug!(path = ?target, bytes = contents.len(), "wrote output");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn writes_land_under_destination() {
        let fs = MockFileSystem::new();
        let writer = DestWriter::new(Arc::new(fs.clone()), "dest/css");
        let path = writer.write(Path::new("app.css"), b"a{}").unwrap();
        assert_eq!(path, PathBuf::from("dest/css/app.css"));
        assert_eq!(fs.written_paths(), vec![PathBuf::from("dest/css/app.css")]);
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let fs = MockFileSystem::new();
        let writer = DestWriter::new(Arc::new(fs.clone()), "dest/css");

        for rel in ["../js/app.js", "/etc/passwd", "a/../../b.css", ""] {
            let err = writer.write(Path::new(rel), b"x").unwrap_err();
            assert!(matches!(err, PipelineError::OutsideDestination { .. }), "{rel}");
        }
        assert!(fs.written_paths().is_empty());
    }
}
