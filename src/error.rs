//! Error types for the candidate matching core
//!
//! Every failure the core can report is a distinct variant of [`MatchError`],
//! so callers can tell an integrity failure from a bad query from an I/O
//! problem without inspecting message strings.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for index building, loading and search
#[derive(Error, Debug)]
pub enum MatchError {
    /// Build input is not a well-formed N×D matrix
    #[error("Embedding matrix has invalid shape {shape:?}: {reason}")]
    Shape { shape: Vec<usize>, reason: String },

    /// Index rows and catalog entries disagree
    #[error(
        "Index/catalog out of sync: index has {index_rows} rows but catalog has {catalog_len} entries"
    )]
    IndexCatalogMismatch {
        index_rows: usize,
        catalog_len: usize,
    },

    /// Vector dimensionality differs from the store's
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Query vector cannot be scored
    #[error("Invalid query vector: {reason}")]
    InvalidQuery { reason: String },

    /// Missing or unreadable artifact
    #[error("Failed to access artifact '{path}': {source}")]
    ArtifactIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Artifact bytes are not a valid index or embeddings file
    #[error("Artifact '{path}' has invalid format: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("Failed to parse catalog '{path}': {source}")]
    CatalogParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Duplicate candidate identifier '{id}' at rows {first} and {second}")]
    DuplicateIdentifier {
        id: String,
        first: usize,
        second: usize,
    },

    /// Embedding provider failures
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("No index is loaded. Build the index and reload before searching")]
    NoActiveIndex,

    #[error("Candidate '{id}' is not in the loaded catalog")]
    UnknownCandidate { id: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl MatchError {
    /// Wrap an I/O error with the artifact path that caused it.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::ArtifactIo {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn invalid_format(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn shape(shape: &[usize], reason: impl Into<String>) -> Self {
        Self::Shape {
            shape: shape.to_vec(),
            reason: reason.into(),
        }
    }

    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::Shape { .. } => "SHAPE_ERROR",
            Self::IndexCatalogMismatch { .. } => "INDEX_CATALOG_MISMATCH",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::InvalidQuery { .. } => "INVALID_QUERY",
            Self::ArtifactIo { .. } => "ARTIFACT_IO_ERROR",
            Self::InvalidFormat { .. } => "INVALID_FORMAT",
            Self::CatalogParse { .. } => "CATALOG_PARSE_ERROR",
            Self::DuplicateIdentifier { .. } => "DUPLICATE_IDENTIFIER",
            Self::Embedding(_) => "EMBEDDING_ERROR",
            Self::NoActiveIndex => "NO_ACTIVE_INDEX",
            Self::UnknownCandidate { .. } => "UNKNOWN_CANDIDATE",
            Self::Config { .. } => "CONFIG_ERROR",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Shape { .. } => vec![
                "Raw embeddings must be a two-dimensional N x D matrix",
                "Regenerate the embeddings artifact with 'candimatch precompute'",
            ],
            Self::IndexCatalogMismatch { .. } => vec![
                "The index and catalog were produced from different snapshots",
                "Run 'candimatch precompute' to rebuild both artifacts together",
            ],
            Self::DimensionMismatch { .. } => vec![
                "Query vectors must come from the same embedding model as the index",
                "Check the [embedding] model setting against the index manifest",
            ],
            Self::InvalidQuery { .. } => {
                vec!["Query components must be finite and small enough to square in f32"]
            }
            Self::ArtifactIo { .. } => vec![
                "Check that the file exists and you have read permissions",
                "Check the [artifacts] paths in settings.toml",
            ],
            Self::InvalidFormat { .. } => vec![
                "The artifact may be truncated or written by an incompatible version",
                "Rebuild it with 'candimatch build' or 'candimatch precompute'",
            ],
            Self::CatalogParse { .. } | Self::DuplicateIdentifier { .. } => vec![
                "The catalog must be a JSON array of {\"id\", \"profile_text\"} objects",
                "Identifiers must be unique within one catalog snapshot",
            ],
            Self::NoActiveIndex => vec!["Run 'candimatch check' to verify the artifacts load"],
            Self::UnknownCandidate { .. } => {
                vec!["Identifiers are matched exactly; check the catalog artifact"]
            }
            _ => vec![],
        }
    }
}

/// Result type alias for core operations
pub type MatchResult<T> = Result<T, MatchError>;

/// Helper trait for attaching an artifact path to I/O errors
pub trait ArtifactContext<T> {
    fn with_artifact(self, path: &Path) -> MatchResult<T>;
}

impl<T> ArtifactContext<T> for Result<T, std::io::Error> {
    fn with_artifact(self, path: &Path) -> MatchResult<T> {
        self.map_err(|e| MatchError::io(path, e))
    }
}
