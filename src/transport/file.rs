//! # File Sink
//!
//! Dry-run transport: every job is written to a file instead of a printer,
//! so the exact command stream can be inspected with a hex viewer or
//! replayed later with `cat job.bin > /dev/rfcomm0`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::Transport;
use crate::error::{LabelprintError, Result};

/// Writes each job to `path`, replacing the previous contents.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for FileSink {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        fs::write(&self.path, data).map_err(|e| {
            LabelprintError::Transport(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        info!("Wrote {} bytes to {}", data.len(), self.path.display());
        Ok(())
    }
}
