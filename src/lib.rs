//! Semantic candidate matching over a flat inner-product embedding index.
//!
//! Candidate profiles are embedded, L2-normalized and stored row-for-row
//! with an ordered catalog. A search scores a query against every row,
//! ranks by cosine similarity and optionally restricts the ranking to a
//! set of identifiers.

pub mod catalog;
pub mod config;
pub mod display;
pub mod error;
pub mod io;
pub mod loader;
pub mod service;
pub mod snapshot;
pub mod storage;
pub mod vector;

// Explicit exports for better API clarity
pub use catalog::{CandidateCatalog, CandidateId, CandidateRecord};
pub use config::Settings;
pub use error::{MatchError, MatchResult};
pub use loader::IndexLoader;
pub use service::MatchService;
pub use snapshot::{ActiveIndex, IndexSnapshot};
pub use storage::IndexManifest;
pub use vector::{
    BuildReport, EmbeddingGenerator, FastEmbedGenerator, IndexBuilder, KnnSearchEngine,
    RawEmbeddings, SearchHit, VectorDimension, VectorIndexStore,
};
