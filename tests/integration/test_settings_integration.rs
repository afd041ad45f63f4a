//! Settings files driving where the service reads and writes artifacts.

use std::sync::Arc;

use candimatch::{CandidateCatalog, MatchService, Settings};
use tempfile::TempDir;

use crate::common::{KeywordEmbedder, sample_records};

#[test]
fn test_service_follows_configured_artifact_names() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    let data_dir = temp_dir.path().join("matching");

    std::fs::write(
        &config_path,
        format!(
            r#"
data_dir = '{}'

[artifacts]
catalog = "people.json"
index = "people.index"
embeddings = "people.bin"

[search]
default_top_k = 2
"#,
            data_dir.display()
        ),
    )
    .unwrap();

    let settings = Settings::load_from(&config_path).unwrap();
    let service = MatchService::new(&settings).with_embedder(Arc::new(KeywordEmbedder::new()));
    service
        .precompute(CandidateCatalog::from_records(sample_records()).unwrap(), |_| {})
        .unwrap();

    assert!(data_dir.join("people.json").exists());
    assert!(data_dir.join("people.index").exists());
    assert!(data_dir.join("people.bin").exists());

    let hits = service.search_text("designer", None, None).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id.as_str(), "c2");
}

#[test]
fn test_generated_settings_file_loads_with_defaults() {
    let temp_dir = TempDir::new().unwrap();

    let path = Settings::init_config_file_in(temp_dir.path(), false).unwrap();
    let settings = Settings::load_from(&path).unwrap();

    assert!(settings.validate().is_ok());
    assert_eq!(settings.embedding.model, "BGEBaseENV15");
    assert_eq!(
        settings.index_path().file_name().and_then(|n| n.to_str()),
        Some("candidates.index")
    );
}
