//! Vector indexing and nearest-neighbor search.
//!
//! This module holds the flat inner-product index over L2-normalized
//! candidate embeddings, the builder that produces it from raw embeddings,
//! and the exhaustive top-k search engine.
//!
//! # Architecture
//! Raw embeddings ([`RawEmbeddings`]) are validated and normalized by
//! [`IndexBuilder`] into a [`VectorIndexStore`], persisted as one atomic
//! artifact. [`KnnSearchEngine`] scans a store row by row; with unit
//! vectors the inner product is the cosine similarity, so no distance
//! transform is needed.

mod builder;
mod embedding;
mod engine;
mod matrix;
pub mod similarity;
mod storage;
mod types;

pub use builder::{BuildReport, IndexBuilder};
#[cfg(test)]
pub use embedding::MockEmbeddingGenerator;
pub use embedding::{
    EmbeddingGenerator, FastEmbedGenerator, model_to_string, parse_embedding_model,
};
pub use engine::{DEFAULT_PARALLEL_MIN_ROWS, KnnSearchEngine, SearchHit};
pub use matrix::RawEmbeddings;
pub use storage::VectorIndexStore;
pub use types::{Metric, RowIndex, VectorDimension};
