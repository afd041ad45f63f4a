//! Candidate catalog: the ordered identifier/profile-text list that defines
//! the searchable universe.
//!
//! A record's position in the catalog is the only link between a candidate
//! and its row in the vector index. The catalog is therefore never sorted,
//! deduplicated in place, or otherwise reordered after it is loaded.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ArtifactContext, MatchError, MatchResult};
use crate::storage::{StagedArtifact, stage_bytes_atomic};
use crate::vector::RowIndex;

/// Opaque candidate identifier, unique within one catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CandidateId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CandidateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CandidateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One catalog entry as stored in the catalog artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    #[serde(default)]
    pub profile_text: String,
}

impl CandidateRecord {
    pub fn new(id: impl Into<CandidateId>, profile_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            profile_text: profile_text.into(),
        }
    }
}

/// Ordered, duplicate-free list of candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCatalog {
    records: Vec<CandidateRecord>,
    positions: HashMap<CandidateId, usize>,
}

impl CandidateCatalog {
    /// Builds a catalog, rejecting duplicate identifiers.
    pub fn from_records(records: Vec<CandidateRecord>) -> MatchResult<Self> {
        let mut positions = HashMap::with_capacity(records.len());
        for (row, record) in records.iter().enumerate() {
            if let Some(first) = positions.insert(record.id.clone(), row) {
                return Err(MatchError::DuplicateIdentifier {
                    id: record.id.to_string(),
                    first,
                    second: row,
                });
            }
        }
        Ok(Self { records, positions })
    }

    /// Reads a catalog artifact (a JSON array of `{id, profile_text}`).
    pub fn load(path: &Path) -> MatchResult<Self> {
        let json = std::fs::read_to_string(path).with_artifact(path)?;
        let records: Vec<CandidateRecord> =
            serde_json::from_str(&json).map_err(|source| MatchError::CatalogParse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_records(records)
    }

    /// Writes the catalog artifact atomically, preserving order.
    pub fn save(&self, path: &Path) -> MatchResult<()> {
        self.stage(path)?.commit()
    }

    /// Serializes the catalog to a staged file next to `path`.
    pub fn stage(&self, path: &Path) -> MatchResult<StagedArtifact> {
        let json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| MatchError::invalid_format(path, format!("serialize catalog: {e}")))?;
        stage_bytes_atomic(path, json.as_bytes())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, row: RowIndex) -> Option<&CandidateRecord> {
        self.records.get(row.get())
    }

    /// Row of the candidate with this identifier.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<RowIndex> {
        self.positions.get(id).copied().map(RowIndex::new)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Profile texts in catalog order, ready for batch embedding.
    pub fn profile_texts(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.profile_text.as_str()).collect()
    }
}
