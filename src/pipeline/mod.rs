//! Pipeline entry points.
//!
//! - `load_reference_index`: build the USDA reference index
//! - `run_ingest`: list the registry, fetch and merge in batches, stream the output

pub mod batch;
pub mod ingest;
pub mod merge;
pub mod reference;
pub mod writer;

pub use batch::{BatchContext, process_batch};
pub use ingest::{IngestOptions, run_ingest};
pub use merge::{assemble, fallback_records};
pub use reference::load_reference_index;
pub use writer::{WriteProgress, WriterCommand, WriterHandle};
