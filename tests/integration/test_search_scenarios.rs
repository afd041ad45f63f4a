//! End-to-end search over the three-candidate fixture.

use std::collections::HashSet;

use candimatch::CandidateId;

use crate::common::{KeywordEmbedder, TestWorkspace, sample_records};

fn loaded_workspace() -> (TestWorkspace, candimatch::MatchService) {
    let workspace = TestWorkspace::new();
    workspace.write_pair(sample_records());
    let service = workspace.service();
    service.reload().expect("fresh pair loads");
    (workspace, service)
}

fn c3_query() -> Vec<f32> {
    KeywordEmbedder::new().vector("backend engineer with 5 years experience")
}

#[test]
fn test_own_embedding_ranks_candidate_first() {
    let (_workspace, service) = loaded_workspace();

    let hits = service.search(&c3_query(), Some(2), None).unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id.as_str(), "c3");
    assert!((hits[0].score - 1.0).abs() < 1e-5, "score {}", hits[0].score);
    assert_eq!(hits[1].id.as_str(), "c1");
    assert!(hits[1].score > 0.0);
}

#[test]
fn test_filter_returns_only_requested_candidate() {
    let (_workspace, service) = loaded_workspace();
    let filter: HashSet<CandidateId> = [CandidateId::from("c2")].into_iter().collect();

    let hits = service.search(&c3_query(), Some(2), Some(&filter)).unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id.as_str(), "c2");
}

#[test]
fn test_top_k_zero_is_empty_with_or_without_filter() {
    let (_workspace, service) = loaded_workspace();
    let filter: HashSet<CandidateId> = ["c1".into(), "c3".into()].into_iter().collect();

    assert!(service.search(&c3_query(), Some(0), None).unwrap().is_empty());
    assert!(
        service
            .search(&c3_query(), Some(0), Some(&filter))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_text_query_matches_vector_query() {
    let workspace = TestWorkspace::new();
    workspace.write_pair(sample_records());
    let service = workspace.text_service();
    service.reload().unwrap();

    let by_text = service
        .search_text("backend engineer with 5 years experience", Some(3), None)
        .unwrap();
    let by_vector = service.search(&c3_query(), Some(3), None).unwrap();

    assert_eq!(by_text, by_vector);
}

#[test]
fn test_similar_uses_stored_vector() {
    let (_workspace, service) = loaded_workspace();

    let hits = service.similar("c3", Some(2), None).unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["c3", "c1"]);
}

#[test]
fn test_default_top_k_applies_when_unspecified() {
    let workspace = TestWorkspace::new();
    let records = (0..15)
        .map(|i| candimatch::CandidateRecord::new(format!("id{i}"), format!("skill{i} engineer")))
        .collect();
    workspace.write_pair(records);
    let service = workspace.service();
    service.reload().unwrap();

    let hits = service.similar("id0", None, None).unwrap();
    assert_eq!(hits.len(), service.default_top_k());
    assert_eq!(hits.len(), 10);
}
