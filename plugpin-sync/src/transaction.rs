//! All-or-nothing replacement of the generated artifact.
//!
//! [`ArtifactTransaction::begin`] snapshots the current artifact bytes in
//! memory. Nothing is written next to the artifact while the run is in
//! progress, so a process killed mid-run leaves no scratch files behind.
//! [`commit`](ArtifactTransaction::commit) writes the new content through
//! the atomic writer. If the transaction is dropped uncommitted (error, early
//! return, panic), `Drop` puts the snapshot back: the original bytes are
//! restored, or the file is removed if it did not exist before.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};
use crate::writer::{atomic_write, WriteResult};

/// Guard over one artifact path for the duration of a run.
pub struct ArtifactTransaction {
    path: PathBuf,
    original: Option<Vec<u8>>,
    finished: bool,
}

impl ArtifactTransaction {
    /// Snapshot `path` and start the transaction.
    pub fn begin(path: &Path) -> Result<Self, SyncError> {
        let original = match fs::read(path) {
            Ok(bytes) => {
                tracing::debug!("snapshot of {} ({} bytes)", path.display(), bytes.len());
                Some(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(io_err(path, e)),
        };

        Ok(ArtifactTransaction {
            path: path.to_path_buf(),
            original,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` if the artifact existed when the transaction began.
    pub fn had_original(&self) -> bool {
        self.original.is_some()
    }

    /// Write `content` and drop the snapshot.
    ///
    /// A failed write leaves the transaction uncommitted, so the original is
    /// restored when `self` drops.
    pub fn commit(mut self, content: &str) -> Result<WriteResult, SyncError> {
        let result = atomic_write(&self.path, content)?;
        self.finished = true;
        Ok(result)
    }

    /// Restore the snapshot now and report any failure.
    pub fn rollback(mut self) -> Result<(), SyncError> {
        self.finished = true;
        self.restore()
    }

    fn restore(&self) -> Result<(), SyncError> {
        match &self.original {
            Some(original) => {
                match fs::read(&self.path) {
                    Ok(current) if current == *original => return Ok(()),
                    Ok(_) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(io_err(&self.path, e)),
                }
                fs::write(&self.path, original).map_err(|e| io_err(&self.path, e))?;
                tracing::warn!("restored {} from snapshot", self.path.display());
            }
            None => match fs::remove_file(&self.path) {
                Ok(()) => tracing::warn!("removed partial {}", self.path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(&self.path, e)),
            },
        }
        Ok(())
    }
}

impl Drop for ArtifactTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.restore() {
            tracing::error!("could not restore {}: {e}", self.path.display());
        }
    }
}
