//! Crash-safe file replacement
//!
//! Content goes to a temporary sibling that is flushed and synced before it
//! is renamed over the target, so readers only ever see the old or the new
//! complete file.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::Builder;

use crate::error::{HarvestError, Result};

/// Replace `path` with whatever `write` produces
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| HarvestError::storage_write(path, e))?;

    let prefix = format!(
        ".{}.",
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    let mut temp = Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| HarvestError::storage_write(path, e))?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write(&mut writer)?;
        writer
            .flush()
            .map_err(|e| HarvestError::storage_write(path, e))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| HarvestError::storage_write(path, e))?;
    temp.persist(path)
        .map_err(|e| HarvestError::storage_write(path, e.error))?;

    sync_dir(dir).map_err(|e| HarvestError::storage_write(path, e))
}

/// Replace `path` with the pretty-printed JSON form of `value`
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, value)
            .map_err(|e| HarvestError::storage_write(path, e))?;
        writer
            .write_all(b"\n")
            .map_err(|e| HarvestError::storage_write(path, e))
    })
}

/// Read a JSON file; `Ok(None)` when it does not exist
///
/// Read and parse failures are turned into an error by `corrupt`, so callers
/// decide whether an unusable file is a ledger or a dataset problem.
pub fn read_json<T, F>(path: &Path, corrupt: F) -> Result<Option<T>>
where
    T: DeserializeOwned,
    F: FnOnce(String) -> HarvestError,
{
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(corrupt(format!("unreadable: {e}"))),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| corrupt(e.to_string()))
}

/// Make a completed rename durable
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
