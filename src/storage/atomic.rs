//! Atomic artifact replacement.
//!
//! Artifacts are written to a temporary file in the destination directory,
//! flushed and fsynced, then renamed over the destination. A concurrent
//! reader sees either the old artifact or the new one, never a torn file,
//! and a failed write leaves the old artifact in place.
//!
//! Writing and renaming are split: [`stage_atomic`] produces a
//! [`StagedArtifact`] whose temp file is complete on disk, and
//! [`StagedArtifact::commit`] renames it into place. Several artifacts that
//! must change together are all staged before any is committed. A staged
//! artifact dropped without commit removes its temp file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{ArtifactContext, MatchResult};

/// A fully written artifact waiting to be renamed over its destination.
#[derive(Debug)]
pub struct StagedArtifact {
    temp: NamedTempFile,
    path: PathBuf,
}

impl StagedArtifact {
    /// Renames the staged file over its destination.
    pub fn commit(self) -> MatchResult<()> {
        let Self { temp, path } = self;
        temp.persist(&path).map_err(|e| e.error).with_artifact(&path)?;
        sync_dir(parent_dir(&path));
        Ok(())
    }
}

/// Writes the contents of `path` to a temp file next to it without
/// replacing the destination yet.
pub fn stage_atomic<F>(path: &Path, write: F) -> MatchResult<StagedArtifact>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> io::Result<()>,
{
    let parent = parent_dir(path);
    std::fs::create_dir_all(parent).with_artifact(parent)?;

    let mut temp = NamedTempFile::new_in(parent).with_artifact(parent)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write(&mut writer).with_artifact(path)?;
        writer.flush().with_artifact(path)?;
    }
    temp.as_file().sync_all().with_artifact(path)?;

    Ok(StagedArtifact {
        temp,
        path: path.to_path_buf(),
    })
}

/// Stages a byte buffer.
pub fn stage_bytes_atomic(path: &Path, bytes: &[u8]) -> MatchResult<StagedArtifact> {
    stage_atomic(path, |w| w.write_all(bytes))
}

/// Write `path` atomically using `write` to produce the contents.
pub fn write_atomic<F>(path: &Path, write: F) -> MatchResult<()>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> io::Result<()>,
{
    stage_atomic(path, write)?.commit()
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

// Directory fsync makes the rename durable on unix; other platforms cannot
// open a directory as a file, so failures are ignored.
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}
