// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Filtering event paths through the union of the watch patterns.
//! - (Optionally) suppressing events whose file content did not change.
//! - Classifying what is left and turning it into category triggers.

pub mod cache;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod watcher;

pub use cache::ContentCache;
pub use event_handler::ChangeFilter;
pub use watcher::{spawn_watcher, WatcherHandle};
