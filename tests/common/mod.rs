#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use candimatch::{
    CandidateCatalog, CandidateRecord, EmbeddingGenerator, MatchResult, MatchService,
    RawEmbeddings, Settings, VectorDimension,
};
use tempfile::TempDir;

/// Dimension used by [`KeywordEmbedder`] in tests. Large enough that the
/// fixture vocabulary hashes without collisions.
pub const TEST_DIMENSION: usize = 64;

/// Deterministic bag-of-words embedder.
///
/// Each lowercase word is hashed into one bucket, so texts that share
/// words have a positive cosine and texts that share none score zero.
pub struct KeywordEmbedder {
    dimension: VectorDimension,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: VectorDimension::new(TEST_DIMENSION).expect("non-zero dimension"),
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let dim = self.dimension.get();
        let mut v = vec![0.0; dim];
        for word in text.split_whitespace() {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(17usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize))
                % dim;
            v[bucket] += 1.0;
        }
        v
    }
}

impl EmbeddingGenerator for KeywordEmbedder {
    fn generate_embeddings(&self, texts: &[&str]) -> MatchResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}

/// The three-candidate catalog used across the search scenarios.
pub fn sample_records() -> Vec<CandidateRecord> {
    vec![
        CandidateRecord::new("c1", "senior backend engineer"),
        CandidateRecord::new("c2", "junior designer"),
        CandidateRecord::new("c3", "backend engineer with 5 years experience"),
    ]
}

pub fn sample_catalog() -> CandidateCatalog {
    CandidateCatalog::from_records(sample_records()).expect("unique ids")
}

/// An isolated data directory with settings pointing into it.
pub struct TestWorkspace {
    pub dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn settings(&self) -> Settings {
        Settings {
            data_dir: self.path().to_path_buf(),
            ..Settings::default()
        }
    }

    /// Service with no embedder attached.
    pub fn service(&self) -> MatchService {
        MatchService::new(&self.settings())
    }

    /// Service with a [`KeywordEmbedder`] attached.
    pub fn text_service(&self) -> MatchService {
        MatchService::new(&self.settings()).with_embedder(Arc::new(KeywordEmbedder::new()))
    }

    /// Writes the catalog and a keyword-embedded index for `records`.
    pub fn write_pair(&self, records: Vec<CandidateRecord>) {
        let catalog = CandidateCatalog::from_records(records).expect("unique ids");
        self.text_service()
            .precompute(catalog, |_| {})
            .expect("precompute succeeds");
    }

    pub fn write_catalog(&self, records: Vec<CandidateRecord>) {
        CandidateCatalog::from_records(records)
            .expect("unique ids")
            .save(&self.settings().catalog_path())
            .expect("catalog written");
    }

    /// Keyword embeddings for `records`, in order.
    pub fn raw_for(records: &[CandidateRecord]) -> RawEmbeddings {
        let embedder = KeywordEmbedder::new();
        RawEmbeddings::from_rows(
            records
                .iter()
                .map(|r| embedder.vector(&r.profile_text))
                .collect(),
        )
        .expect("rectangular rows")
    }

    /// Names of files in the data directory, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.path())
            .expect("readable dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
