use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::LOCK_FILE;
use crate::error::{HarvestError, Result};

/// Exclusive claim on an output directory for one collection run
///
/// The lock file is created with `create_new`, so a second run fails instead
/// of interleaving writes. It is removed when the guard is dropped.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Take the lock for `output_dir`, creating the directory if needed
    pub fn acquire(output_dir: &Path) -> Result<Self> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(LOCK_FILE);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(HarvestError::AlreadyRunning(path));
            }
            Err(e) => return Err(HarvestError::Io(e)),
        };
        let lock = Self { path };
        writeln!(file, "{}", std::process::id())?;
        Ok(lock)
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
        }
    }
}
