//! The single scratch file every fetch goes through.
//!
//! Fetches happen one at a time, and each staged entry is written to the
//! archive before the next fetch, so one file is enough. It is reset before
//! every reuse and removed when the run ends.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Reserve a uniquely named scratch file in `dir` (created if missing).
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("shelvepack-{}.tmp", Uuid::new_v4()));
        debug!(path = %path.display(), "scratch file reserved");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete any content left by the previous fetch.
    pub fn reset(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Open the fetched content for reading.
    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = self.reset() {
            warn!(path = %self.path.display(), error = %e, "failed to remove scratch file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reset_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let scratch = ScratchFile::new(dir.path()).unwrap();
        scratch.reset().unwrap();
        fs::write(scratch.path(), b"old").unwrap();
        scratch.reset().unwrap();
        assert!(!scratch.path().exists());
        scratch.reset().unwrap();
    }

    #[test]
    fn dropped_scratch_is_removed() {
        let dir = TempDir::new().unwrap();
        let path = {
            let scratch = ScratchFile::new(&dir.path().join("nested")).unwrap();
            fs::write(scratch.path(), b"data").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
