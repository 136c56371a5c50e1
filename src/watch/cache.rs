// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Last seen content hash per watched file.
///
/// Editors often emit several events for one save, and some touch files
/// without changing them; comparing against the last hash filters both.
#[derive(Debug, Default)]
pub struct ContentCache {
    hashes: HashMap<PathBuf, String>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `hash` for `path`. Returns false if it equals the stored one.
    pub fn update(&mut self, path: &Path, hash: String) -> bool {
        match self.hashes.get(path) {
            Some(old) if *old == hash => false,
            _ => {
                self.hashes.insert(path.to_path_buf(), hash);
                true
            }
        }
    }

    /// Forget a file (e.g. it was removed).
    pub fn invalidate(&mut self, path: &Path) {
        if self.hashes.remove(path).is_some() {
            debug!("invalidated cache for {:?}", path);
        }
    }
}
