//! Readers running while the active pair is rebuilt and reloaded.

use std::sync::atomic::{AtomicBool, Ordering};

use candimatch::{CandidateCatalog, CandidateRecord};

use crate::common::{TestWorkspace, sample_records};

fn grown_catalog() -> CandidateCatalog {
    let mut records = sample_records();
    records.push(CandidateRecord::new("c4", "staff backend engineer"));
    records.push(CandidateRecord::new("c5", "senior designer"));
    CandidateCatalog::from_records(records).unwrap()
}

#[test]
fn test_readers_always_see_a_consistent_pair() {
    let workspace = TestWorkspace::new();
    let service = workspace.text_service();
    service
        .precompute(CandidateCatalog::from_records(sample_records()).unwrap(), |_| {})
        .unwrap();

    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let mut searches = 0usize;
                while !done.load(Ordering::Acquire) || searches == 0 {
                    let snapshot = service.active().require().unwrap();
                    assert_eq!(snapshot.store().row_count(), snapshot.catalog().len());

                    let hits = service.similar("c1", Some(10), None).unwrap();
                    assert!(hits.len() == 3 || hits.len() == 5, "got {}", hits.len());
                    assert_eq!(hits[0].id.as_str(), "c1");
                    searches += 1;
                }
            });
        }

        scope.spawn(|| {
            for round in 0..20 {
                let catalog = if round % 2 == 0 {
                    grown_catalog()
                } else {
                    CandidateCatalog::from_records(sample_records()).unwrap()
                };
                service.precompute(catalog, |_| {}).unwrap();
                service.reload().unwrap();
            }
            done.store(true, Ordering::Release);
        });
    });

    // One precompute plus twenty rounds of precompute and reload
    assert_eq!(service.active().version(), Some(41));
}
