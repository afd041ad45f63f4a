//! Type-safe wrappers and core types for the vector index.
//!
//! Newtypes here keep dimensions, row positions and similarity metrics
//! from being passed around as bare integers.

use crate::error::{MatchError, MatchResult};
use serde::{Deserialize, Serialize};

/// Type-safe wrapper for vector dimensions.
///
/// Ensures runtime validation of vector dimensions to prevent
/// mismatches between queries, stores and embedding models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns a shape error if the dimension is zero.
    pub fn new(dim: usize) -> MatchResult<Self> {
        if dim == 0 {
            return Err(MatchError::shape(&[0], "vector dimension cannot be zero"));
        }
        Ok(Self(dim))
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> MatchResult<()> {
        if vector.len() != self.0 {
            return Err(MatchError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl TryFrom<usize> for VectorDimension {
    type Error = MatchError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VectorDimension> for usize {
    fn from(dim: VectorDimension) -> usize {
        dim.0
    }
}

impl std::fmt::Display for VectorDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a vector inside the store, equal to its catalog position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowIndex(usize);

impl RowIndex {
    #[must_use]
    pub const fn new(row: usize) -> Self {
        Self(row)
    }

    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }
}

/// Similarity function a flat index is built for.
///
/// Only inner product is produced today; the tag is persisted so a
/// future metric cannot be silently read as the wrong one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    InnerProduct,
}

impl Metric {
    #[must_use]
    pub const fn tag(self) -> u32 {
        match self {
            Self::InnerProduct => 1,
        }
    }

    #[must_use]
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::InnerProduct),
            _ => None,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InnerProduct => write!(f, "inner_product"),
        }
    }
}
