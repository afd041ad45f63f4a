//! Matching service: the query surface handed to a serving layer.
//!
//! [`MatchService`] owns the active snapshot handle, the search engine and
//! an optional embedding provider. Searches run lock-free against whatever
//! snapshot was current when they started. Builds and reloads are
//! serialized with each other and only ever replace the active snapshot
//! after the new pair is complete and verified.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::catalog::{CandidateCatalog, CandidateId};
use crate::config::Settings;
use crate::error::{MatchError, MatchResult};
use crate::loader::IndexLoader;
use crate::snapshot::{ActiveIndex, IndexSnapshot};
use crate::storage::StagedArtifact;
use crate::vector::similarity::l2_normalized;
use crate::vector::{
    BuildReport, EmbeddingGenerator, IndexBuilder, KnnSearchEngine, RawEmbeddings, SearchHit,
};

/// Query and lifecycle operations over one (catalog, index) artifact pair.
pub struct MatchService {
    loader: IndexLoader,
    embeddings_path: PathBuf,
    default_top_k: usize,
    batch_size: usize,
    engine: KnnSearchEngine,
    embedder: Option<Arc<dyn EmbeddingGenerator>>,
    active: ActiveIndex,
    // Serializes writers; readers never take it
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for MatchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchService")
            .field("index", &self.loader.index_path())
            .field("catalog", &self.loader.catalog_path())
            .field("embedder", &self.embedder.as_ref().map(|e| e.model_name()))
            .field("version", &self.active.version())
            .finish()
    }
}

impl MatchService {
    /// Creates a service over the artifacts named in `settings`.
    ///
    /// Nothing is loaded yet; call [`MatchService::reload`] before searching.
    pub fn new(settings: &Settings) -> Self {
        Self {
            loader: IndexLoader::new(settings.index_path(), settings.catalog_path()),
            embeddings_path: settings.embeddings_path(),
            default_top_k: settings.search.default_top_k,
            batch_size: settings.embedding.batch_size.max(1),
            engine: KnnSearchEngine::new()
                .with_parallel_min_rows(settings.search.parallel_min_rows),
            embedder: None,
            active: ActiveIndex::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Attaches the provider used by text queries and precompute.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingGenerator>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn active(&self) -> &ActiveIndex {
        &self.active
    }

    #[must_use]
    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    fn embedder(&self) -> MatchResult<&Arc<dyn EmbeddingGenerator>> {
        self.embedder.as_ref().ok_or_else(|| MatchError::Config {
            reason: "no embedding provider is configured".to_string(),
        })
    }

    /// Embeds `text` and returns the unit-length vector.
    pub fn embed(&self, text: &str) -> MatchResult<Vec<f32>> {
        let vector = self.embedder()?.embed(text)?;
        Ok(l2_normalized(&vector))
    }

    /// Searches the active snapshot with a query vector.
    ///
    /// `top_k` falls back to the configured default when `None`.
    pub fn search(
        &self,
        query: &[f32],
        top_k: Option<usize>,
        filter: Option<&HashSet<CandidateId>>,
    ) -> MatchResult<Vec<SearchHit>> {
        let snapshot = self.active.require()?;
        self.search_snapshot(&snapshot, query, top_k, filter)
    }

    /// Embeds requirement text and searches with it.
    pub fn search_text(
        &self,
        text: &str,
        top_k: Option<usize>,
        filter: Option<&HashSet<CandidateId>>,
    ) -> MatchResult<Vec<SearchHit>> {
        let embedder = self.embedder()?;
        let snapshot = self.active.require()?;

        let expected = snapshot.store().dimension().get();
        let actual = embedder.dimension().get();
        if expected != actual {
            return Err(MatchError::DimensionMismatch { expected, actual });
        }

        let query = embedder.embed(text)?;
        self.search_snapshot(&snapshot, &query, top_k, filter)
    }

    /// Searches with the stored vector of a catalogued candidate.
    pub fn similar(
        &self,
        id: &str,
        top_k: Option<usize>,
        filter: Option<&HashSet<CandidateId>>,
    ) -> MatchResult<Vec<SearchHit>> {
        let snapshot = self.active.require()?;
        let query = snapshot
            .catalog()
            .position(id)
            .and_then(|row| snapshot.store().row(row))
            .ok_or_else(|| MatchError::UnknownCandidate { id: id.to_string() })?
            .to_vec();
        self.search_snapshot(&snapshot, &query, top_k, filter)
    }

    fn search_snapshot(
        &self,
        snapshot: &IndexSnapshot,
        query: &[f32],
        top_k: Option<usize>,
        filter: Option<&HashSet<CandidateId>>,
    ) -> MatchResult<Vec<SearchHit>> {
        self.engine.search(
            query,
            snapshot.store(),
            snapshot.catalog(),
            top_k.unwrap_or(self.default_top_k),
            filter,
        )
    }

    /// Loads the artifact pair from disk and makes it the active snapshot.
    ///
    /// On failure the previous snapshot stays active and the error is
    /// returned. Returns the new snapshot version on success.
    pub fn reload(&self) -> MatchResult<u64> {
        let _guard = self.write_lock.lock();
        match self.loader.load() {
            Ok(snapshot) => Ok(self.active.install(snapshot).version()),
            Err(e) => {
                warn!(
                    error = %e,
                    version = ?self.active.version(),
                    "reload failed; keeping the current snapshot"
                );
                Err(e)
            }
        }
    }

    /// Builds an index from raw embeddings paired with the catalog on disk.
    ///
    /// The row count is checked against the catalog before anything is
    /// written, so a mismatched build leaves both the artifacts and the
    /// active snapshot untouched. On success the new pair becomes active.
    pub fn build_or_update(&self, raw: RawEmbeddings) -> MatchResult<BuildReport> {
        let _guard = self.write_lock.lock();
        let catalog = CandidateCatalog::load(self.loader.catalog_path())?;

        let mut builder = IndexBuilder::new();
        if let Some(embedder) = &self.embedder {
            builder = builder.with_model_name(embedder.model_name());
        }
        self.build_and_install(&builder, catalog, raw, Vec::new())
    }

    /// Embeds every catalog profile and rebuilds all artifacts from them.
    ///
    /// The embeddings, catalog and index are replaced together; if any of
    /// them cannot be written none of them changes.
    ///
    /// `on_progress` is called after each embedding batch with the number
    /// of rows embedded so far.
    pub fn precompute(
        &self,
        catalog: CandidateCatalog,
        mut on_progress: impl FnMut(usize),
    ) -> MatchResult<BuildReport> {
        let embedder = Arc::clone(self.embedder()?);
        let _guard = self.write_lock.lock();

        let dimension = embedder.dimension();
        let texts = catalog.profile_texts();
        let mut data = Vec::with_capacity(texts.len() * dimension.get());
        for batch in texts.chunks(self.batch_size) {
            for vector in embedder.generate_embeddings(batch)? {
                dimension.validate_vector(&vector)?;
                data.extend_from_slice(&vector);
            }
            on_progress(data.len() / dimension.get());
        }

        let raw = RawEmbeddings::new(vec![texts.len(), dimension.get()], data);
        let companions = vec![
            raw.stage(&self.embeddings_path)?,
            catalog.stage(self.loader.catalog_path())?,
        ];

        let builder = IndexBuilder::new().with_model_name(embedder.model_name());
        let mut report = self.build_and_install(&builder, catalog, raw, companions)?;
        report.embeddings_path = Some(self.embeddings_path.clone());

        info!(
            rows = report.rows,
            model = embedder.model_name(),
            "precompute finished"
        );
        Ok(report)
    }

    fn build_and_install(
        &self,
        builder: &IndexBuilder,
        catalog: CandidateCatalog,
        raw: RawEmbeddings,
        companions: Vec<StagedArtifact>,
    ) -> MatchResult<BuildReport> {
        let (store, degenerate_rows) = builder.build(raw)?;
        if store.row_count() != catalog.len() {
            return Err(MatchError::IndexCatalogMismatch {
                index_rows: store.row_count(),
                catalog_len: catalog.len(),
            });
        }

        let index_path = self.loader.index_path();
        builder.persist_with(&store, index_path, companions)?;
        let report = BuildReport::new(&store, degenerate_rows, index_path);

        self.active.install(IndexSnapshot::new(catalog, store)?);
        Ok(report)
    }
}
