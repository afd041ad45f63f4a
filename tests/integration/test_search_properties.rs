//! Ranking invariants checked over a larger synthetic index.

use std::collections::HashSet;

use candimatch::{
    CandidateCatalog, CandidateId, CandidateRecord, IndexBuilder, IndexSnapshot, KnnSearchEngine,
    RawEmbeddings, VectorIndexStore,
};

const ROWS: usize = 200;
const DIM: usize = 24;

/// Small LCG so fixtures are reproducible without extra dependencies.
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
    }

    fn vector(&mut self) -> Vec<f32> {
        (0..DIM).map(|_| self.next_f32() * 10.0).collect()
    }
}

fn fixture() -> (IndexSnapshot, Vec<Vec<f32>>) {
    let mut rng = Lcg(42);
    let rows: Vec<Vec<f32>> = (0..ROWS).map(|_| rng.vector()).collect();
    let catalog = CandidateCatalog::from_records(
        (0..ROWS)
            .map(|i| CandidateRecord::new(format!("cand-{i:03}"), ""))
            .collect(),
    )
    .unwrap();
    let (store, _) = IndexBuilder::new()
        .build(RawEmbeddings::from_rows(rows.clone()).unwrap())
        .unwrap();
    (IndexSnapshot::new(catalog, store).unwrap(), rows)
}

fn search(
    snapshot: &IndexSnapshot,
    query: &[f32],
    top_k: usize,
    filter: Option<&HashSet<CandidateId>>,
) -> Vec<candimatch::SearchHit> {
    KnnSearchEngine::new()
        .search(query, snapshot.store(), snapshot.catalog(), top_k, filter)
        .unwrap()
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[test]
fn test_every_stored_row_is_unit_length() {
    let (snapshot, _) = fixture();
    let store: &VectorIndexStore = snapshot.store();

    assert_eq!(store.row_count(), ROWS);
    for row in store.rows() {
        assert!((norm(row) - 1.0).abs() < 1e-5);
    }
}

#[test]
fn test_every_row_is_its_own_nearest_neighbor() {
    let (snapshot, rows) = fixture();

    for (i, raw) in rows.iter().enumerate().step_by(17) {
        let hits = search(&snapshot, raw, 1, None);
        assert_eq!(hits[0].row.get(), i);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }
}

#[test]
fn test_filtered_results_are_the_filtered_unfiltered_ranking() {
    let (snapshot, _) = fixture();
    let query = Lcg(7).vector();
    let full = search(&snapshot, &query, ROWS, None);

    let filters: Vec<HashSet<CandidateId>> = vec![
        ["cand-000", "cand-199", "cand-100"]
            .into_iter()
            .map(CandidateId::from)
            .collect(),
        (0..ROWS)
            .step_by(3)
            .map(|i| CandidateId::from(format!("cand-{i:03}")))
            .collect(),
        ["cand-005", "not-in-catalog"]
            .into_iter()
            .map(CandidateId::from)
            .collect(),
    ];

    for filter in &filters {
        for top_k in [1, 5, 50, ROWS + 10] {
            let hits = search(&snapshot, &query, top_k, Some(filter));

            assert!(hits.iter().all(|h| filter.contains(&h.id)));

            let expected: Vec<_> = full
                .iter()
                .filter(|h| filter.contains(&h.id))
                .take(top_k)
                .cloned()
                .collect();
            assert_eq!(hits, expected);

            let matching = filter
                .iter()
                .filter(|id| snapshot.catalog().contains(id.as_str()))
                .count();
            assert_eq!(hits.len(), top_k.min(matching));
        }
    }
}

#[test]
fn test_result_length_is_bounded_by_top_k() {
    let (snapshot, _) = fixture();
    let query = Lcg(9).vector();

    for top_k in [0, 1, 10, ROWS, ROWS * 2] {
        assert_eq!(search(&snapshot, &query, top_k, None).len(), top_k.min(ROWS));
    }
}

#[test]
fn test_repeated_searches_are_identical() {
    let (snapshot, _) = fixture();
    let query = Lcg(11).vector();

    let first = search(&snapshot, &query, 25, None);
    for _ in 0..5 {
        assert_eq!(search(&snapshot, &query, 25, None), first);
    }
}

#[test]
fn test_duplicate_vectors_tie_in_row_order() {
    let rows = vec![
        vec![0.0, 1.0],
        vec![3.0, 3.0],
        vec![1.0, 0.0],
        vec![3.0, 3.0],
    ];
    let catalog = CandidateCatalog::from_records(
        ["w", "x", "y", "z"]
            .into_iter()
            .map(|id| CandidateRecord::new(id, ""))
            .collect(),
    )
    .unwrap();
    let (store, _) = IndexBuilder::new()
        .build(RawEmbeddings::from_rows(rows).unwrap())
        .unwrap();
    let snapshot = IndexSnapshot::new(catalog, store).unwrap();

    let hits = search(&snapshot, &[1.0, 1.0], 4, None);
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["x", "z", "w", "y"]);
}
