// src/tasks/mod.rs

//! Task execution layer.
//!
//! - [`pipeline`] holds the five category tasks.
//! - [`transform`] runs external commands against a staging directory.
//! - [`imagemin`] is the built-in image compressor.
//! - [`iconfont`] generates the icon font and fans it out to its two sinks.
//! - [`dest`] guards writes to a destination directory.
//! - [`backend`] is the seam between the runtime and the pipeline.

pub mod backend;
pub mod dest;
pub mod iconfont;
pub mod imagemin;
pub mod pipeline;
pub mod transform;

pub use backend::{PipelineBackend, TaskBackend};
pub use dest::DestWriter;
pub use pipeline::Pipeline;
pub use transform::{CommandTransformer, TransformOutput, Transformer};
