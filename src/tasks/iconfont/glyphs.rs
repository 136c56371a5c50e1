// src/tasks/iconfont/glyphs.rs

use std::path::PathBuf;

use crate::dispatch::SourceFile;

/// One icon of the font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    /// File stem of the source SVG; becomes the CSS class suffix.
    pub name: String,
    pub codepoint: u32,
    pub source: PathBuf,
}

impl Glyph {
    /// Lowercase hex codepoint as used in CSS escapes (`ea01`).
    pub fn codepoint_hex(&self) -> String {
        format!("{:x}", self.codepoint)
    }
}

/// Glyphs for `sources`, sorted by file name, with sequential codepoints
/// from `start`.
pub fn assign_codepoints(sources: &[SourceFile], start: u32) -> Vec<Glyph> {
    let mut named: Vec<(String, PathBuf)> = sources
        .iter()
        .map(|s| {
            let name = s
                .path
                .file_stem()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (name, s.path.clone())
        })
        .collect();
    named.sort();

    named
        .into_iter()
        .zip(start..)
        .map(|((name, source), codepoint)| Glyph {
            name,
            codepoint,
            source,
        })
        .collect()
}
