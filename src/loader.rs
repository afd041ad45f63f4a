//! Loads a persisted index artifact together with its catalog.
//!
//! Loading is the only place the on-disk pair is checked for alignment.
//! A pair that passes here can be installed and searched without further
//! integrity checks.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use crate::catalog::CandidateCatalog;
use crate::error::MatchResult;
use crate::snapshot::IndexSnapshot;
use crate::storage::IndexManifest;
use crate::vector::VectorIndexStore;

/// Loader for one (index, catalog) artifact pair.
#[derive(Debug, Clone)]
pub struct IndexLoader {
    index_path: PathBuf,
    catalog_path: PathBuf,
}

impl IndexLoader {
    pub fn new(index_path: impl Into<PathBuf>, catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            catalog_path: catalog_path.into(),
        }
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    /// Reads both artifacts and returns a verified snapshot.
    ///
    /// # Errors
    /// `ArtifactIo` for a missing or unreadable file, `InvalidFormat` for a
    /// corrupt index, `CatalogParse`/`DuplicateIdentifier` for a bad catalog,
    /// and `IndexCatalogMismatch` when the row count differs from the
    /// catalog length.
    pub fn load(&self) -> MatchResult<IndexSnapshot> {
        let started = Instant::now();

        let store = VectorIndexStore::open(&self.index_path)?;
        let catalog = CandidateCatalog::load(&self.catalog_path)?;
        let manifest = IndexManifest::load(&self.index_path)?;

        if let Some(manifest) = &manifest {
            if manifest.row_count != store.row_count() || manifest.dimension != store.dimension().get()
            {
                warn!(
                    manifest_rows = manifest.row_count,
                    index_rows = store.row_count(),
                    manifest_dimension = manifest.dimension,
                    index_dimension = store.dimension().get(),
                    "index manifest is stale; trusting the index artifact"
                );
            }
        }

        let rows = store.row_count();
        let dimension = store.dimension().get();
        let snapshot = IndexSnapshot::new(catalog, store)?.with_manifest(manifest);

        info!(
            rows,
            dimension,
            index = %self.index_path.display(),
            catalog = %self.catalog_path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index loaded"
        );

        Ok(snapshot)
    }
}
