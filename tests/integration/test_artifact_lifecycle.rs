//! Build, load and reload behavior of the on-disk artifact pair.

use candimatch::{
    CandidateRecord, IndexLoader, IndexManifest, MatchError, RawEmbeddings, VectorIndexStore,
};

use crate::common::{TEST_DIMENSION, TestWorkspace, sample_records};

#[test]
fn test_precompute_writes_all_artifacts_and_no_temp_files() {
    let workspace = TestWorkspace::new();
    workspace.write_pair(sample_records());

    assert_eq!(
        workspace.file_names(),
        vec![
            "candidate_embeddings.bin",
            "candidates.index",
            "candidates.index.meta.json",
            "candidates.json",
        ]
    );

    let raw = RawEmbeddings::open(&workspace.settings().embeddings_path()).unwrap();
    assert_eq!(raw.shape(), &[3, TEST_DIMENSION]);

    let manifest = IndexManifest::load(&workspace.settings().index_path())
        .unwrap()
        .unwrap();
    assert_eq!(manifest.row_count, 3);
    assert_eq!(manifest.dimension, TEST_DIMENSION);
    assert_eq!(manifest.model_name.as_deref(), Some("keyword-test"));
}

#[test]
fn test_build_from_raw_embeddings_then_load() {
    let workspace = TestWorkspace::new();
    let records = sample_records();
    workspace.write_catalog(records.clone());

    let service = workspace.service();
    let report = service
        .build_or_update(TestWorkspace::raw_for(&records))
        .unwrap();

    assert_eq!(report.rows, 3);
    assert!(report.degenerate_rows.is_empty());
    assert_eq!(service.active().version(), Some(1));

    let settings = workspace.settings();
    let snapshot = IndexLoader::new(settings.index_path(), settings.catalog_path())
        .load()
        .unwrap();
    assert_eq!(snapshot.store().row_count(), snapshot.catalog().len());
}

#[test]
fn test_out_of_sync_catalog_fails_to_load() {
    let workspace = TestWorkspace::new();
    workspace.write_pair(sample_records());

    // Catalog gains a candidate the index has never seen
    let mut grown = sample_records();
    grown.push(CandidateRecord::new("c4", "product manager"));
    workspace.write_catalog(grown);

    let service = workspace.service();
    match service.reload() {
        Err(MatchError::IndexCatalogMismatch {
            index_rows,
            catalog_len,
        }) => {
            assert_eq!(index_rows, 3);
            assert_eq!(catalog_len, 4);
        }
        other => panic!("Expected IndexCatalogMismatch, got {other:?}"),
    }
    assert!(service.active().snapshot().is_none());
}

#[test]
fn test_truncated_index_is_invalid_format() {
    let workspace = TestWorkspace::new();
    workspace.write_pair(sample_records());

    let index_path = workspace.settings().index_path();
    let bytes = std::fs::read(&index_path).unwrap();
    std::fs::write(&index_path, &bytes[..bytes.len() - 4]).unwrap();

    assert!(matches!(
        VectorIndexStore::open(&index_path),
        Err(MatchError::InvalidFormat { .. })
    ));
}

#[test]
fn test_wrong_magic_is_invalid_format() {
    let workspace = TestWorkspace::new();
    workspace.write_pair(sample_records());

    let index_path = workspace.settings().index_path();
    let mut bytes = std::fs::read(&index_path).unwrap();
    bytes[..4].copy_from_slice(b"NOPE");
    std::fs::write(&index_path, bytes).unwrap();

    assert!(matches!(
        workspace.service().reload(),
        Err(MatchError::InvalidFormat { .. })
    ));
}

#[test]
fn test_failed_reload_keeps_previous_pair() {
    let workspace = TestWorkspace::new();
    workspace.write_pair(sample_records());

    let service = workspace.service();
    assert_eq!(service.reload().unwrap(), 1);

    // Break the catalog on disk
    std::fs::write(workspace.settings().catalog_path(), "[{\"id\": ").unwrap();
    assert!(matches!(
        service.reload(),
        Err(MatchError::CatalogParse { .. })
    ));

    // Old snapshot is still served, unchanged
    assert_eq!(service.active().version(), Some(1));
    let hits = service.similar("c3", Some(3), None).unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].id.as_str(), "c3");
}

#[test]
fn test_rebuild_then_reload_serves_new_pair() {
    let workspace = TestWorkspace::new();
    workspace.write_pair(sample_records());

    let service = workspace.service();
    service.reload().unwrap();
    let before = service.active().require().unwrap();

    let mut grown = sample_records();
    grown.push(CandidateRecord::new("c4", "staff backend engineer"));
    workspace.write_pair(grown);

    assert_eq!(service.reload().unwrap(), 2);
    assert_eq!(service.active().require().unwrap().catalog().len(), 4);
    // A snapshot taken before the reload is unaffected
    assert_eq!(before.catalog().len(), 3);
    assert_eq!(before.store().row_count(), 3);
}

#[test]
fn test_zero_norm_profile_is_reported_and_never_matches_strongly() {
    let workspace = TestWorkspace::new();
    let mut records = sample_records();
    records.push(CandidateRecord::new("c4", ""));
    workspace.write_catalog(records.clone());

    let service = workspace.service();
    let report = service
        .build_or_update(TestWorkspace::raw_for(&records))
        .unwrap();
    assert_eq!(report.degenerate_rows, vec![3]);

    let hits = service.similar("c1", Some(4), None).unwrap();
    let empty = hits.iter().find(|h| h.id.as_str() == "c4").unwrap();
    assert_eq!(empty.score, 0.0);
}

#[test]
fn test_mismatched_raw_embeddings_leave_artifacts_alone() {
    let workspace = TestWorkspace::new();
    workspace.write_pair(sample_records());
    let index_path = workspace.settings().index_path();
    let before = std::fs::read(&index_path).unwrap();

    let service = workspace.service();
    let two_rows = TestWorkspace::raw_for(&sample_records()[..2]);
    assert!(matches!(
        service.build_or_update(two_rows),
        Err(MatchError::IndexCatalogMismatch { .. })
    ));

    assert_eq!(std::fs::read(&index_path).unwrap(), before);
    assert!(service.active().snapshot().is_none());
}

#[test]
fn test_failed_manifest_write_keeps_serving_pair_on_disk() {
    let workspace = TestWorkspace::new();
    let records = sample_records();
    workspace.write_pair(records.clone());

    let settings = workspace.settings();
    let index_path = settings.index_path();
    let before = std::fs::read(&index_path).unwrap();

    let manifest_path = IndexManifest::path_for(&index_path);
    std::fs::remove_file(&manifest_path).unwrap();
    std::fs::create_dir_all(manifest_path.join("occupied")).unwrap();

    // Same catalog, different vectors: only the index would change
    let mut raw_rows = vec![vec![0.0; TEST_DIMENSION]; records.len()];
    for (i, row) in raw_rows.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    let service = workspace.service();
    assert!(matches!(
        service.build_or_update(RawEmbeddings::from_rows(raw_rows).unwrap()),
        Err(MatchError::ArtifactIo { .. })
    ));

    assert_eq!(std::fs::read(&index_path).unwrap(), before);
    assert!(service.active().snapshot().is_none());
}

#[test]
fn test_non_finite_embeddings_are_rejected_before_writing() {
    let workspace = TestWorkspace::new();
    let records = sample_records();
    workspace.write_pair(records.clone());
    let index_path = workspace.settings().index_path();
    let before = std::fs::read(&index_path).unwrap();

    let mut raw_rows = vec![vec![0.5; TEST_DIMENSION]; records.len()];
    raw_rows[1][0] = f32::NAN;
    let service = workspace.service();
    assert!(matches!(
        service.build_or_update(RawEmbeddings::from_rows(raw_rows).unwrap()),
        Err(MatchError::Shape { .. })
    ));

    assert_eq!(std::fs::read(&index_path).unwrap(), before);
}
