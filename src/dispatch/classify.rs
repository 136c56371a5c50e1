// src/dispatch/classify.rs

//! Extension-based dispatch rule of the watch loop.

use std::path::Path;

use crate::types::Category;

/// Raster formats the image task knows about.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "ico", "avif"];

/// Result of classifying a changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeClass {
    Script,
    Style,
    Template,
    IconGlyph,
    Image,
    /// No rule matched. Still routed to the image task, but kept distinct so
    /// callers can report it.
    Unrecognized { extension: Option<String> },
}

impl ChangeClass {
    /// The task this change is dispatched to.
    pub fn category(&self) -> Category {
        match self {
            ChangeClass::Script => Category::Script,
            ChangeClass::Style => Category::Style,
            ChangeClass::Template => Category::Template,
            ChangeClass::IconGlyph => Category::IconFont,
            ChangeClass::Image | ChangeClass::Unrecognized { .. } => Category::Image,
        }
    }

    pub fn is_unrecognized(&self) -> bool {
        matches!(self, ChangeClass::Unrecognized { .. })
    }
}

/// Classify a path by its extension, case-insensitively.
///
/// Rules are checked in order and the first match wins:
/// `.js`, `.sass`, `.pug`, `.svg`, known image formats, then the fallback.
pub fn classify(path: &Path) -> ChangeClass {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("js") => ChangeClass::Script,
        Some("sass") => ChangeClass::Style,
        Some("pug") => ChangeClass::Template,
        Some("svg") => ChangeClass::IconGlyph,
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => ChangeClass::Image,
        _ => ChangeClass::Unrecognized { extension },
    }
}
