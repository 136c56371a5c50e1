// src/errors.rs

//! Crate-wide error type and aliases.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Category;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("{category} transform failed: {message}")]
    Transform { category: Category, message: String },

    #[error("refusing to write {path:?} outside destination {dest:?}")]
    OutsideDestination { path: PathBuf, dest: PathBuf },

    #[error("icon font sinks failed (stylesheet: {}, fonts: {})",
        .stylesheet.as_deref().unwrap_or("ok"),
        .fonts.as_deref().unwrap_or("ok"))]
    IconFontSinks {
        stylesheet: Option<String>,
        fonts: Option<String>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn transform(category: Category, message: impl Into<String>) -> Self {
        PipelineError::Transform {
            category,
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
