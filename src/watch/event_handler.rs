// src/watch/event_handler.rs

//! Turning one changed path into (at most) one category trigger.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::dispatch::{classify, WatchSet};
use crate::fs::FileSystem;
use crate::types::Category;
use crate::watch::cache::ContentCache;
use crate::watch::hash::compute_file_hash;
use crate::watch::path_utils::relative_str;

/// Stateful filter applied to every watch event path.
///
/// 1. Relativize against the project root.
/// 2. Keep paths matched by the watch patterns.
/// 3. With `skip_unchanged`, drop files whose content hash equals the last
///    seen one.
/// 4. Classify by extension.
#[derive(Debug)]
pub struct ChangeFilter {
    root: PathBuf,
    watch_set: WatchSet,
    skip_unchanged: bool,
    cache: ContentCache,
}

impl ChangeFilter {
    pub fn new(root: impl Into<PathBuf>, watch_set: WatchSet, skip_unchanged: bool) -> Self {
        Self {
            root: root.into(),
            watch_set,
            skip_unchanged,
            cache: ContentCache::new(),
        }
    }

    /// Category to trigger for a changed path, if any.
    pub fn evaluate(&mut self, fs: &dyn FileSystem, path: &Path) -> Option<Category> {
        let Some(rel) = relative_str(&self.root, path) else {
            warn!("could not relativize path {:?} against root {:?}", path, self.root);
            return None;
        };

        if !self.watch_set.matches(&rel) {
            return None;
        }

        if self.skip_unchanged && !self.content_changed(fs, path, &rel) {
            return None;
        }

        let class = classify(path);
        if class.is_unrecognized() {
            warn!(
                path = %rel,
                "no dispatch rule matches this extension; routing to the image task"
            );
        }

        let category = class.category();
        debug!(path = %rel, %category, "watch match -> triggering task");
        Some(category)
    }

    fn content_changed(&mut self, fs: &dyn FileSystem, path: &Path, rel: &str) -> bool {
        if !fs.is_file(path) {
            // Removed (or a directory): nothing to compare against.
            self.cache.invalidate(path);
            return true;
        }

        match compute_file_hash(fs, path) {
            Ok(hash) => {
                if self.cache.update(path, hash) {
                    true
                } else {
                    info!(path = %rel, "content unchanged; skipping trigger");
                    false
                }
            }
            Err(err) => {
                warn!(path = %rel, error = %err, "failed to hash file; triggering anyway");
                true
            }
        }
    }
}
