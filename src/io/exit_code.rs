//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success - operation completed, results found
//! - `1`: General error - unspecified failure
//! - `3-125`: Specific recoverable errors
//! - `126-255`: Reserved by shell

use crate::error::MatchError;

/// Standard exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Unspecified error occurred (code 1)
    GeneralError = 1,

    /// Unknown candidate, or a search with no results (code 3)
    NotFound = 3,

    /// Artifact I/O error (code 5)
    IoError = 5,

    /// Configuration error (code 6)
    ConfigError = 6,

    /// Artifacts are corrupt or do not belong together (code 7)
    IntegrityError = 7,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl ExitCode {
    /// `Success` when a search returned hits, `NotFound` when it was empty.
    pub fn from_hit_count(hits: usize) -> Self {
        if hits == 0 {
            ExitCode::NotFound
        } else {
            ExitCode::Success
        }
    }

    /// Convert a `MatchError` to the appropriate exit code.
    ///
    /// Maps specific error types to semantic exit codes that scripts
    /// can use to determine appropriate recovery actions.
    pub fn from_error(error: &MatchError) -> Self {
        match error {
            MatchError::UnknownCandidate { .. } => ExitCode::NotFound,

            MatchError::ArtifactIo { .. } => ExitCode::IoError,
            MatchError::Config { .. } => ExitCode::ConfigError,

            // The artifact pair cannot be trusted
            MatchError::IndexCatalogMismatch { .. }
            | MatchError::InvalidFormat { .. }
            | MatchError::CatalogParse { .. }
            | MatchError::DuplicateIdentifier { .. } => ExitCode::IntegrityError,

            _ => ExitCode::GeneralError,
        }
    }
}
