//! Filesystem storage for the pipeline.
//!
//! - `datasets`: cached reference dataset archives
//! - `stream`: the incrementally written merged output

pub mod datasets;
pub mod stream;

pub use datasets::DatasetStore;
pub use stream::{StreamingWriter, WriteSummary};
