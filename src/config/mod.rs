// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Resolve defaults and validate patterns and transforms (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, ConfigSection, IconFontSection, ImageSection, PathConfig, PathEntry,
    PathsSection, RawConfigFile, RawPathEntry, ServerSection, TransformConfig,
};
pub use validate::{normalize_pattern, validate_config};
