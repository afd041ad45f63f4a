//! Manifest sidecar describing a built index.
//!
//! The manifest is informational: the index artifact header is the
//! authority on dimension and row count. The manifest adds what the binary
//! format does not carry, such as which embedding model produced the rows
//! and when the build happened.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{ArtifactContext, MatchError, MatchResult};
use crate::storage::{StagedArtifact, stage_bytes_atomic};
use crate::vector::Metric;

/// Metadata written next to every index artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Dimension of stored vectors
    pub dimension: usize,

    /// Number of rows in the index
    pub row_count: usize,

    pub metric: Metric,

    /// Name of the embedding model used, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    /// Unix timestamp (UTC seconds) of the build
    pub created_at: i64,

    /// Version of the manifest format
    pub version: u32,
}

impl IndexManifest {
    /// Current manifest version
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(
        dimension: usize,
        row_count: usize,
        metric: Metric,
        model_name: Option<String>,
    ) -> Self {
        Self {
            dimension,
            row_count,
            metric,
            model_name,
            created_at: Utc::now().timestamp(),
            version: Self::CURRENT_VERSION,
        }
    }

    /// Location of the manifest for a given index artifact.
    pub fn path_for(index_path: &Path) -> PathBuf {
        let mut name = index_path.as_os_str().to_owned();
        name.push(".meta.json");
        PathBuf::from(name)
    }

    /// Save the manifest next to `index_path`
    pub fn save(&self, index_path: &Path) -> MatchResult<()> {
        self.stage(index_path)?.commit()
    }

    /// Serializes the manifest to a staged file next to `index_path`.
    pub fn stage(&self, index_path: &Path) -> MatchResult<StagedArtifact> {
        let path = Self::path_for(index_path);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| MatchError::invalid_format(&path, format!("serialize manifest: {e}")))?;
        stage_bytes_atomic(&path, json.as_bytes())
    }

    /// Load the manifest for `index_path`.
    ///
    /// A missing manifest is not an error; indexes built by other tools
    /// carry none.
    pub fn load(index_path: &Path) -> MatchResult<Option<Self>> {
        let path = Self::path_for(index_path);
        if !path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&path).with_artifact(&path)?;
        let manifest: Self = serde_json::from_str(&json)
            .map_err(|e| MatchError::invalid_format(&path, format!("parse manifest: {e}")))?;

        if manifest.version > Self::CURRENT_VERSION {
            return Err(MatchError::invalid_format(
                &path,
                format!(
                    "manifest version {} is newer than supported version {}",
                    manifest.version,
                    Self::CURRENT_VERSION
                ),
            ));
        }

        Ok(Some(manifest))
    }
}
