//! Serving snapshots and the atomically swappable active-index handle.
//!
//! An [`IndexSnapshot`] is one immutable (catalog, store) pair. The
//! [`ActiveIndex`] handle holds the snapshot currently being served.
//! Readers clone the `Arc` and search without holding any lock; a reload
//! builds a complete new snapshot first and replaces the `Arc` in one step,
//! so a search sees the old pair or the new pair, never a mix.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::catalog::CandidateCatalog;
use crate::error::{MatchError, MatchResult};
use crate::storage::IndexManifest;
use crate::vector::VectorIndexStore;

/// One immutable catalog/index pair.
#[derive(Debug)]
pub struct IndexSnapshot {
    catalog: CandidateCatalog,
    store: VectorIndexStore,
    manifest: Option<IndexManifest>,
    version: u64,
}

impl IndexSnapshot {
    /// Pairs a catalog with a store, enforcing row alignment.
    pub fn new(catalog: CandidateCatalog, store: VectorIndexStore) -> MatchResult<Self> {
        if store.row_count() != catalog.len() {
            return Err(MatchError::IndexCatalogMismatch {
                index_rows: store.row_count(),
                catalog_len: catalog.len(),
            });
        }
        Ok(Self {
            catalog,
            store,
            manifest: None,
            version: 0,
        })
    }

    pub(crate) fn with_manifest(mut self, manifest: Option<IndexManifest>) -> Self {
        self.manifest = manifest;
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &CandidateCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn store(&self) -> &VectorIndexStore {
        &self.store
    }

    #[must_use]
    pub fn manifest(&self) -> Option<&IndexManifest> {
        self.manifest.as_ref()
    }

    /// Serving epoch; 0 until installed in an [`ActiveIndex`].
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Handle to the snapshot currently being served.
#[derive(Debug, Default)]
pub struct ActiveIndex {
    current: RwLock<Option<Arc<IndexSnapshot>>>,
}

impl ActiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot, if one has been installed.
    ///
    /// The returned `Arc` stays valid for as long as the caller holds it,
    /// even if a reload installs a newer snapshot meanwhile.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.current.read().clone()
    }

    /// Like [`ActiveIndex::snapshot`] but fails when nothing is loaded.
    pub fn require(&self) -> MatchResult<Arc<IndexSnapshot>> {
        self.snapshot().ok_or(MatchError::NoActiveIndex)
    }

    /// Installs a fully built snapshot, replacing the previous one.
    ///
    /// Returns the installed snapshot with its assigned version.
    pub fn install(&self, mut snapshot: IndexSnapshot) -> Arc<IndexSnapshot> {
        let mut slot = self.current.write();
        snapshot.version = slot.as_ref().map_or(1, |prev| prev.version + 1);
        let installed = Arc::new(snapshot);
        *slot = Some(Arc::clone(&installed));
        drop(slot);

        info!(
            version = installed.version,
            rows = installed.store.row_count(),
            "index snapshot installed"
        );
        installed
    }

    #[must_use]
    pub fn version(&self) -> Option<u64> {
        self.current.read().as_ref().map(|s| s.version)
    }
}
