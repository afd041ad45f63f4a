//! Raw embedding matrices and their on-disk artifact.
//!
//! A [`RawEmbeddings`] value is whatever the embedding step produced: a
//! shape of any rank plus a flat f32 buffer. The index builder is the one
//! that insists on a well-formed N×D matrix, so this type accepts any shape
//! and [`RawEmbeddings::matrix_shape`] performs the check.
//!
//! # Storage Format
//!
//! - Magic bytes `CMEM`, format version (u32), rank (u32)
//! - `rank` extents as u64
//! - Flat little-endian f32 data, row-major

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::error::{ArtifactContext, MatchError, MatchResult};
use crate::storage::{StagedArtifact, stage_atomic, write_atomic};
use crate::vector::VectorDimension;

const EMBEDDINGS_VERSION: u32 = 1;
const EMBEDDINGS_MAGIC: &[u8; 4] = b"CMEM";
const FIXED_HEADER_SIZE: usize = 12;
const BYTES_PER_EXTENT: usize = 8;
const BYTES_PER_F32: usize = 4;

/// Upper bound on rank read from disk, guards against garbage headers.
const MAX_RANK: usize = 8;

/// Unvalidated embedding output: a shape and row-major data.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEmbeddings {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl RawEmbeddings {
    /// Wraps a shape and flat buffer without validating them.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// Builds an N×D matrix from rows.
    ///
    /// Fails with a shape error when rows have different lengths. An empty
    /// row list cannot carry a dimension and is rejected as well.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> MatchResult<Self> {
        let Some(first) = rows.first() else {
            return Err(MatchError::shape(&[0], "no rows to infer a dimension from"));
        };
        let dim = first.len();

        let mut data = Vec::with_capacity(rows.len() * dim);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(MatchError::shape(
                    &[rows.len(), dim],
                    format!("row {i} has {} components, expected {dim}", row.len()),
                ));
            }
            data.extend_from_slice(row);
        }

        Ok(Self {
            shape: vec![rows.len(), dim],
            data,
        })
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Checks the value is a well-formed N×D matrix of finite values and
    /// returns (N, D).
    pub fn matrix_shape(&self) -> MatchResult<(usize, VectorDimension)> {
        let &[rows, dim] = self.shape.as_slice() else {
            return Err(MatchError::shape(
                &self.shape,
                format!("expected a 2-dimensional matrix, got rank {}", self.shape.len()),
            ));
        };
        if dim == 0 {
            return Err(MatchError::shape(&self.shape, "row dimension cannot be zero"));
        }
        let expected = rows.checked_mul(dim).ok_or_else(|| {
            MatchError::shape(&self.shape, "element count overflows usize")
        })?;
        if expected != self.data.len() {
            return Err(MatchError::shape(
                &self.shape,
                format!(
                    "shape needs {expected} values but buffer holds {}",
                    self.data.len()
                ),
            ));
        }
        if let Some(pos) = self.data.iter().position(|x| !x.is_finite()) {
            return Err(MatchError::shape(
                &self.shape,
                format!(
                    "row {} column {} holds a non-finite value",
                    pos / dim,
                    pos % dim
                ),
            ));
        }
        Ok((rows, VectorDimension::new(dim)?))
    }

    /// Saves the embeddings artifact atomically.
    pub fn save(&self, path: &Path) -> MatchResult<()> {
        write_atomic(path, |w| self.write_to(w))
    }

    /// Writes the artifact to a staged file without replacing `path` yet.
    pub fn stage(&self, path: &Path) -> MatchResult<StagedArtifact> {
        stage_atomic(path, |w| self.write_to(w))
    }

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(EMBEDDINGS_MAGIC)?;
        w.write_all(&EMBEDDINGS_VERSION.to_le_bytes())?;
        w.write_all(&(self.shape.len() as u32).to_le_bytes())?;
        for &extent in &self.shape {
            w.write_all(&(extent as u64).to_le_bytes())?;
        }
        for &value in &self.data {
            w.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    /// Opens an embeddings artifact.
    ///
    /// Only the container is validated here; the shape is checked by the
    /// consumer through [`RawEmbeddings::matrix_shape`].
    pub fn open(path: &Path) -> MatchResult<Self> {
        let file = File::open(path).with_artifact(path)?;
        let len = file.metadata().with_artifact(path)?.len() as usize;
        if len < FIXED_HEADER_SIZE {
            return Err(MatchError::invalid_format(
                path,
                "file too small to contain header",
            ));
        }
        // SAFETY: the map is read-only and dropped before this function
        // returns; artifacts are replaced by rename, never rewritten in place.
        let mmap = unsafe { Mmap::map(&file) }.with_artifact(path)?;

        if &mmap[0..4] != EMBEDDINGS_MAGIC {
            return Err(MatchError::invalid_format(path, "invalid magic bytes"));
        }
        let version = u32::from_le_bytes([mmap[4], mmap[5], mmap[6], mmap[7]]);
        if version != EMBEDDINGS_VERSION {
            return Err(MatchError::invalid_format(
                path,
                format!("unsupported embeddings version {version}"),
            ));
        }
        let rank = u32::from_le_bytes([mmap[8], mmap[9], mmap[10], mmap[11]]) as usize;
        if rank > MAX_RANK {
            return Err(MatchError::invalid_format(
                path,
                format!("rank {rank} exceeds supported maximum {MAX_RANK}"),
            ));
        }

        let data_offset = FIXED_HEADER_SIZE + rank * BYTES_PER_EXTENT;
        if len < data_offset {
            return Err(MatchError::invalid_format(path, "truncated shape header"));
        }
        let shape: Vec<usize> = mmap[FIXED_HEADER_SIZE..data_offset]
            .chunks_exact(BYTES_PER_EXTENT)
            .map(|b| u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as usize)
            .collect();

        let payload = &mmap[data_offset..];
        if payload.len() % BYTES_PER_F32 != 0 {
            return Err(MatchError::invalid_format(
                path,
                "payload is not a whole number of f32 values",
            ));
        }
        let data = decode_f32_le(payload);

        Ok(Self { shape, data })
    }
}

/// Decodes a little-endian f32 buffer.
pub(crate) fn decode_f32_le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(BYTES_PER_F32)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
