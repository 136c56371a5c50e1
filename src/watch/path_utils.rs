// src/watch/path_utils.rs

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Tries a direct `strip_prefix` first and falls back to comparing
/// canonicalized paths (symlinked temp dirs, `/private/var` on macOS).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize())
        && let Ok(rel) = path_canon.strip_prefix(&root_canon)
    {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_prefix() {
        assert_eq!(
            relative_str(Path::new("/work/site"), Path::new("/work/site/src/app/main.js")),
            Some("src/app/main.js".to_string())
        );
    }

    #[test]
    fn unrelated_path_is_none() {
        assert_eq!(
            relative_str(Path::new("/work/site"), Path::new("/elsewhere/file.js")),
            None
        );
    }
}
