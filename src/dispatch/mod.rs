// src/dispatch/mod.rs

//! Mapping from changed paths to pipeline tasks.
//!
//! - [`classify`] holds the extension rule.
//! - [`patterns`] compiles the configured globs, finds source files and
//!   computes where outputs land.

pub mod classify;
pub mod patterns;

pub use classify::{classify, ChangeClass};
pub use patterns::{collect_sources, glob_base, SourceFile, WatchSet};
