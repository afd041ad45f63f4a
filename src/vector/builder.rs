//! Index builder: raw embeddings in, persisted flat index out.
//!
//! The builder never touches serving state. It produces an artifact (and a
//! manifest next to it); whoever owns the serving snapshot decides when to
//! reload from it.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::MatchResult;
use crate::storage::{IndexManifest, StagedArtifact};
use crate::vector::similarity::{is_degenerate_norm, l2_normalize_in_place};
use crate::vector::{RawEmbeddings, VectorIndexStore};

/// Summary of a completed build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub rows: usize,
    pub dimension: usize,
    /// Rows whose norm was numerically zero; they are stored as zero vectors.
    pub degenerate_rows: Vec<usize>,
    pub index_path: PathBuf,
    /// Raw embeddings artifact, when the build started from text.
    pub embeddings_path: Option<PathBuf>,
}

impl BuildReport {
    pub fn new(store: &VectorIndexStore, degenerate_rows: Vec<usize>, index_path: &Path) -> Self {
        Self {
            rows: store.row_count(),
            dimension: store.dimension().get(),
            degenerate_rows,
            index_path: index_path.to_path_buf(),
            embeddings_path: None,
        }
    }
}

/// Builds flat inner-product indexes from raw embeddings.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    model_name: Option<String>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the embedding model in the manifest written next to the index.
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    /// Normalizes and validates raw embeddings into an in-memory store.
    ///
    /// Returns the store plus the positions of zero-norm rows.
    pub fn build(&self, raw: RawEmbeddings) -> MatchResult<(VectorIndexStore, Vec<usize>)> {
        let (rows, dimension) = raw.matrix_shape()?;
        let mut data = raw.into_data();

        let mut degenerate_rows = Vec::new();
        for (i, row) in data.chunks_exact_mut(dimension.get()).enumerate() {
            let norm = l2_normalize_in_place(row);
            if is_degenerate_norm(norm) {
                degenerate_rows.push(i);
            }
        }

        if !degenerate_rows.is_empty() {
            warn!(
                count = degenerate_rows.len(),
                "embedding rows with zero norm will score 0.0 against every query"
            );
        }

        let store = VectorIndexStore::from_normalized(dimension, data);
        debug_assert_eq!(store.row_count(), rows);
        Ok((store, degenerate_rows))
    }

    /// Builds an index and persists it at `index_path`.
    ///
    /// The artifact is replaced atomically; on any error the previous
    /// artifact (if one exists) is left untouched.
    pub fn build_and_persist(
        &self,
        raw: RawEmbeddings,
        index_path: &Path,
    ) -> MatchResult<BuildReport> {
        let (store, degenerate_rows) = self.build(raw)?;
        self.persist(&store, index_path)?;
        Ok(BuildReport::new(&store, degenerate_rows, index_path))
    }

    /// Writes a built store and its manifest.
    pub fn persist(&self, store: &VectorIndexStore, index_path: &Path) -> MatchResult<()> {
        self.persist_with(store, index_path, Vec::new())
    }

    /// Writes a built store, its manifest and `companions` as one change.
    ///
    /// Every artifact is staged before any is renamed into place, so a
    /// failed write leaves all destinations untouched. The manifest is
    /// committed first because a stale one only warns on load; the index
    /// is committed last.
    pub fn persist_with(
        &self,
        store: &VectorIndexStore,
        index_path: &Path,
        companions: Vec<StagedArtifact>,
    ) -> MatchResult<()> {
        let manifest = IndexManifest::new(
            store.dimension().get(),
            store.row_count(),
            store.metric(),
            self.model_name.clone(),
        )
        .stage(index_path)?;
        let index = store.stage(index_path)?;

        manifest.commit()?;
        for staged in companions {
            staged.commit()?;
        }
        index.commit()?;

        info!(
            rows = store.row_count(),
            dimension = store.dimension().get(),
            path = %index_path.display(),
            "index built"
        );
        Ok(())
    }
}
