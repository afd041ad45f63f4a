//! Artifact persistence helpers shared by the builder and loader.

mod atomic;
mod manifest;

pub use atomic::{StagedArtifact, stage_atomic, stage_bytes_atomic, write_atomic};
pub use manifest::IndexManifest;
