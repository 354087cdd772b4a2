//! Retrieval and the ingest/answer pipeline.

pub mod format;
pub mod pipeline;
pub mod retriever;

pub use format::{format_results, NO_RESULTS};
pub use pipeline::{ingest, Answer, IngestReport, Pipeline};
pub use retriever::Retriever;
