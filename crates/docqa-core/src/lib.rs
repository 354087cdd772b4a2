//! docqa-core
//!
//! Shared data model, error taxonomy, capability traits, configuration and
//! the document loader used by the embedding, index and retrieval crates.

pub mod chunking;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use config::{Config, Settings};
pub use error::{Error, Result};
pub use traits::{Embedder, Generator};
pub use types::{Chunk, Metadata, Metric, SearchHit, SOURCE_KEY};
