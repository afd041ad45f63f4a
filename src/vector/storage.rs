//! Flat inner-product vector index and its on-disk artifact.
//!
//! The store is a dense row-major N×D matrix of unit vectors. Row `i`
//! belongs to catalog entry `i`; nothing else links a vector to a
//! candidate, so the store never reorders rows.
//!
//! # Storage Format
//!
//! The artifact uses a simple binary format optimized for sequential access:
//! - Header (24 bytes): magic `CMIX`, version, metric tag, dimension, row count (u64)
//! - Vectors: contiguous f32 arrays in little-endian format
//!
//! The file length must equal the header plus `rows * dimension * 4` bytes
//! exactly; a truncated or padded artifact is rejected.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use memmap2::MmapOptions;

use crate::error::{ArtifactContext, MatchError, MatchResult};
use crate::storage::{StagedArtifact, stage_atomic, write_atomic};
use crate::vector::matrix::decode_f32_le;
use crate::vector::{Metric, RowIndex, VectorDimension};

/// Current index format version.
const INDEX_VERSION: u32 = 1;

/// Size of the index header in bytes.
const HEADER_SIZE: usize = 24;

/// Magic bytes to identify index files.
const MAGIC_BYTES: &[u8; 4] = b"CMIX";

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// Immutable flat index over normalized embeddings.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndexStore {
    dimension: VectorDimension,
    metric: Metric,
    row_count: usize,
    data: Vec<f32>,
}

impl VectorIndexStore {
    /// Wraps an already-normalized row-major buffer.
    ///
    /// The buffer length must be a multiple of `dimension`; callers that
    /// take raw input go through the index builder instead.
    pub(crate) fn from_normalized(dimension: VectorDimension, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len() % dimension.get(), 0);
        Self {
            dimension,
            metric: Metric::InnerProduct,
            row_count: data.len() / dimension.get(),
            data,
        }
    }

    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Number of stored vectors.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Returns the vector stored at `row`, if any.
    #[must_use]
    pub fn row(&self, row: RowIndex) -> Option<&[f32]> {
        let dim = self.dimension.get();
        let start = row.get().checked_mul(dim)?;
        self.data.get(start..start + dim)
    }

    /// Iterates over rows in storage order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension.get())
    }

    /// The flat row-major buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Persists the index as one atomic artifact.
    pub fn save(&self, path: &Path) -> MatchResult<()> {
        write_atomic(path, |w| self.write_to(w))
    }

    /// Writes the artifact to a staged file without replacing `path` yet.
    pub fn stage(&self, path: &Path) -> MatchResult<StagedArtifact> {
        stage_atomic(path, |w| self.write_to(w))
    }

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(MAGIC_BYTES)?;
        w.write_all(&INDEX_VERSION.to_le_bytes())?;
        w.write_all(&self.metric.tag().to_le_bytes())?;
        w.write_all(&(self.dimension.get() as u32).to_le_bytes())?;
        w.write_all(&(self.row_count as u64).to_le_bytes())?;
        for &value in &self.data {
            w.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    /// Opens an index artifact and reads it fully into memory.
    ///
    /// The artifact is memory-mapped only for the duration of the read, so
    /// a later atomic replacement of the file never affects a loaded store.
    pub fn open(path: &Path) -> MatchResult<Self> {
        let file = File::open(path).with_artifact(path)?;
        let file_len = file.metadata().with_artifact(path)?.len() as usize;
        if file_len < HEADER_SIZE {
            return Err(MatchError::invalid_format(
                path,
                "file too small to contain header",
            ));
        }

        // SAFETY: read-only map, dropped before returning; writers replace
        // artifacts by rename and never truncate them in place.
        let mmap = unsafe { MmapOptions::new().map(&file) }.with_artifact(path)?;

        let header = read_header(path, &mmap)?;
        let expected_len = header
            .row_count
            .checked_mul(header.dimension.get())
            .and_then(|n| n.checked_mul(BYTES_PER_F32))
            .and_then(|n| n.checked_add(HEADER_SIZE))
            .ok_or_else(|| MatchError::invalid_format(path, "matrix size overflows"))?;
        if expected_len != mmap.len() {
            return Err(MatchError::invalid_format(
                path,
                format!(
                    "file size mismatch (expected {expected_len} bytes, got {})",
                    mmap.len()
                ),
            ));
        }

        let data = decode_f32_le(&mmap[HEADER_SIZE..]);
        if let Some(pos) = data.iter().position(|x| !x.is_finite()) {
            return Err(MatchError::invalid_format(
                path,
                format!("row {} holds a non-finite value", pos / header.dimension.get()),
            ));
        }

        Ok(Self {
            dimension: header.dimension,
            metric: header.metric,
            row_count: header.row_count,
            data,
        })
    }
}

struct IndexHeader {
    metric: Metric,
    dimension: VectorDimension,
    row_count: usize,
}

fn read_header(path: &Path, bytes: &[u8]) -> MatchResult<IndexHeader> {
    if &bytes[0..4] != MAGIC_BYTES {
        return Err(MatchError::invalid_format(path, "invalid magic bytes"));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != INDEX_VERSION {
        return Err(MatchError::invalid_format(
            path,
            format!("index version {version} is not supported (expected {INDEX_VERSION})"),
        ));
    }

    let tag = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let metric = Metric::from_tag(tag)
        .ok_or_else(|| MatchError::invalid_format(path, format!("unknown metric tag {tag}")))?;

    let dim_value = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
    let dimension = VectorDimension::new(dim_value)
        .map_err(|_| MatchError::invalid_format(path, "stored dimension is zero"))?;

    let row_count = u64::from_le_bytes([
        bytes[16], bytes[17], bytes[18], bytes[19], bytes[20], bytes[21], bytes[22], bytes[23],
    ]) as usize;

    Ok(IndexHeader {
        metric,
        dimension,
        row_count,
    })
}
