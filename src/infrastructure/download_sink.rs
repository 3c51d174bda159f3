//! Download sink - saves exported documents to the local filesystem.
//!
//! Payloads are staged in a temporary file next to the target and renamed
//! into place. The staging file is removed on drop whenever the save does
//! not complete, and a repeated save replaces the previous file.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::{AppError, Result};

/// Receives finished export payloads.
pub trait DownloadSink: Send + Sync {
    /// Persist `payload` under `file_name` and return where it landed.
    ///
    /// # Errors
    /// Returns error if the payload cannot be written.
    fn save(&self, file_name: &str, payload: &[u8]) -> Result<PathBuf>;
}

/// Sink writing into a directory on disk.
#[derive(Debug, Clone)]
pub struct FileDownloadSink {
    dir: PathBuf,
}

impl FileDownloadSink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for FileDownloadSink {
    fn save(&self, file_name: &str, payload: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::io(
                format!("Failed to create download directory {}", self.dir.display()),
                e,
            )
        })?;

        let target = self.dir.join(file_name);

        let mut staged = NamedTempFile::new_in(&self.dir)
            .map_err(|e| AppError::io("Failed to create temporary download file", e))?;
        staged
            .write_all(payload)
            .and_then(|()| staged.flush())
            .map_err(|e| AppError::io("Failed to write download", e))?;

        staged.persist(&target).map_err(|e| {
            AppError::io(format!("Failed to save {}", target.display()), e.error)
        })?;

        tracing::info!(path = %target.display(), bytes = payload.len(), "Download saved");

        Ok(target)
    }
}
