use std::{
    fs,
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::trace;

use super::record::BatchRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on batch record: {0}")]
    Io(#[from] io::Error),
    #[error("Batch record is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Failed to replace batch record: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Single-slot file holding the current batch record.
///
/// Every save writes a complete record to a temporary file next to the
/// target and renames it over the target, so readers only ever observe the
/// previous or the new record in full.
#[derive(Debug, Clone)]
pub struct BatchStore {
    path: PathBuf,
}

impl BatchStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current record. A missing or empty file means no record.
    pub fn load(&self) -> Result<Option<BatchRecord>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Atomically replace the stored record.
    pub fn save(&self, record: &BatchRecord) -> Result<(), StoreError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, record)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        trace!("Persisted batch record {} to {}", record.batch_id, self.path.display());
        Ok(())
    }
}
