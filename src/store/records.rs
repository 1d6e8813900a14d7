//! JSON record I/O.
//!
//! Records are replaced atomically: the new content goes to a temporary file
//! in the destination directory which is then renamed over the target, so a
//! reader sees either the old or the new document, never a partial one.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{QueueError, Result};

/// Read and parse a record, mapping a missing file to `Ok(None)`.
pub fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(QueueError::storage(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| QueueError::Serialization {
            path: path.to_path_buf(),
            source,
        })
}

/// Write `value` to `path`, replacing any existing record.
pub fn write_record<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = stage_record(path, value)?;
    tmp.persist(path)
        .map_err(|e| QueueError::storage(path, e.error))?;
    Ok(())
}

/// Write `value` to `path` only if nothing exists there yet.
///
/// Returns `Ok(false)` if the path was already taken.
pub fn create_record<T: Serialize>(path: &Path, value: &T) -> Result<bool> {
    let tmp = stage_record(path, value)?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(QueueError::storage(path, e.error)),
    }
}

/// Overwrite the record at `path` only if one is there.
///
/// Returns `Ok(false)` without writing when the record is gone, so an update
/// racing a delete does not bring the deleted record back. The presence check
/// runs after the new content is fully staged, leaving only the final rename
/// between check and replace.
pub fn replace_record<T: Serialize>(path: &Path, value: &T) -> Result<bool> {
    let tmp = stage_record(path, value)?;
    if !path.is_file() {
        return Ok(false);
    }
    tmp.persist(path)
        .map_err(|e| QueueError::storage(path, e.error))?;
    Ok(true)
}

fn stage_record<T: Serialize>(path: &Path, value: &T) -> Result<NamedTempFile> {
    let dir = path
        .parent()
        .ok_or_else(|| QueueError::InvalidArgument(format!("{} has no parent", path.display())))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| QueueError::storage(dir, e))?;
    serde_json::to_writer_pretty(&mut tmp, value).map_err(|source| {
        QueueError::Serialization {
            path: path.to_path_buf(),
            source,
        }
    })?;
    tmp.write_all(b"\n")
        .and_then(|_| tmp.flush())
        .map_err(|e| QueueError::storage(path, e))?;
    Ok(tmp)
}

/// Remove a file, treating "already gone" as success. Returns whether a file
/// was actually removed.
pub fn remove_record(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(QueueError::storage(path, e)),
    }
}
