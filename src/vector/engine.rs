//! Exhaustive k-nearest-neighbor search over a flat index.
//!
//! Every search scores the query against every stored row, ranks all rows,
//! and only then applies the caller's identifier filter before truncating
//! to `top_k`. Filtering after ranking means the result is always the true
//! top-k inside the filter set, at the cost of a full scan regardless of
//! how selective the filter is.
//!
//! # Ordering
//! Rows are ordered by descending score. Equal scores keep ascending row
//! order (first loaded, first returned), so identical inputs always give
//! identical output.

use std::collections::HashSet;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::catalog::{CandidateCatalog, CandidateId};
use crate::error::{MatchError, MatchResult};
use crate::vector::similarity::{inner_product, l2_norm, l2_normalized};
use crate::vector::{RowIndex, VectorIndexStore};

/// Stores at least this large are scored with rayon.
pub const DEFAULT_PARALLEL_MIN_ROWS: usize = 4096;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(rename = "candidate_id")]
    pub id: CandidateId,
    pub score: f32,
    #[serde(skip)]
    pub row: RowIndex,
}

/// Stateless exhaustive search engine.
///
/// Holds only tuning knobs; all data comes in through [`KnnSearchEngine::search`],
/// so one engine can serve any number of concurrent searches.
#[derive(Debug, Clone, Copy)]
pub struct KnnSearchEngine {
    parallel_min_rows: usize,
}

impl Default for KnnSearchEngine {
    fn default() -> Self {
        Self {
            parallel_min_rows: DEFAULT_PARALLEL_MIN_ROWS,
        }
    }
}

impl KnnSearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row count at which scoring switches to a parallel scan.
    ///
    /// Parallel and sequential scans produce identical results.
    pub fn with_parallel_min_rows(mut self, rows: usize) -> Self {
        self.parallel_min_rows = rows;
        self
    }

    /// Searches for the `top_k` candidates most similar to `query`.
    ///
    /// # Arguments
    /// * `query` - Query embedding; normalized here before scoring
    /// * `store` - Index to scan
    /// * `catalog` - Catalog aligned row-for-row with `store`
    /// * `top_k` - Maximum number of results
    /// * `filter` - When present and non-empty, only these identifiers are returned
    ///
    /// # Errors
    /// `DimensionMismatch` when the query length differs from the store's
    /// dimension; `InvalidQuery` when a component is NaN or infinite or the
    /// norm overflows; `IndexCatalogMismatch` when `store` and `catalog` are
    /// not the same length.
    pub fn search(
        &self,
        query: &[f32],
        store: &VectorIndexStore,
        catalog: &CandidateCatalog,
        top_k: usize,
        filter: Option<&HashSet<CandidateId>>,
    ) -> MatchResult<Vec<SearchHit>> {
        store.dimension().validate_vector(query)?;
        validate_query(query)?;
        if store.row_count() != catalog.len() {
            return Err(MatchError::IndexCatalogMismatch {
                index_rows: store.row_count(),
                catalog_len: catalog.len(),
            });
        }

        if top_k == 0 || store.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let query = l2_normalized(query);
        let scores = self.score_all(&query, store);
        let ranked = rank(&scores);

        let filter = filter.filter(|ids| !ids.is_empty());
        let hits: Vec<SearchHit> = ranked
            .into_iter()
            .filter_map(|row| {
                let record = catalog.get(RowIndex::new(row))?;
                match filter {
                    Some(ids) if !ids.contains(record.id.as_str()) => None,
                    _ => Some(SearchHit {
                        id: record.id.clone(),
                        score: scores[row],
                        row: RowIndex::new(row),
                    }),
                }
            })
            .take(top_k)
            .collect();

        debug!(
            rows = store.row_count(),
            top_k,
            filter_len = filter.map_or(0, HashSet::len),
            returned = hits.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "knn search"
        );

        Ok(hits)
    }

    /// Similarity of the query against every row, in row order.
    fn score_all(&self, query: &[f32], store: &VectorIndexStore) -> Vec<f32> {
        let dim = store.dimension().get();
        if store.row_count() >= self.parallel_min_rows {
            store
                .as_slice()
                .par_chunks_exact(dim)
                .map(|row| inner_product(query, row))
                .collect()
        } else {
            store.rows().map(|row| inner_product(query, row)).collect()
        }
    }
}

fn validate_query(query: &[f32]) -> MatchResult<()> {
    if let Some(pos) = query.iter().position(|x| !x.is_finite()) {
        return Err(MatchError::InvalidQuery {
            reason: format!("component {pos} is not finite"),
        });
    }
    if !l2_norm(query).is_finite() {
        return Err(MatchError::InvalidQuery {
            reason: "norm overflows f32".to_string(),
        });
    }
    Ok(())
}

/// Row indices ordered by descending score, ties by ascending row.
fn rank(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    order
}
