// src/watch/hash.rs

use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Hex blake3 digest of a file's contents.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs
        .read(path)
        .with_context(|| format!("reading file for hashing: {:?}", path))?;
    Ok(hash_bytes(&bytes))
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn equal_contents_hash_equal() {
        let fs = MockFileSystem::new();
        fs.add_file("a.sass", b"body\n  color: red".to_vec());
        fs.add_file("b.sass", b"body\n  color: red".to_vec());

        let a = compute_file_hash(&fs, Path::new("a.sass")).unwrap();
        let b = compute_file_hash(&fs, Path::new("b.sass")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_bytes(b"body\n  color: blue"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let fs = MockFileSystem::new();
        assert!(compute_file_hash(&fs, Path::new("gone.js")).is_err());
    }
}
