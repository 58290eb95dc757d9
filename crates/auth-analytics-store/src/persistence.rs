// crates/auth-analytics-store/src/persistence.rs
// ============================================================================
// Module: Atomic File Persistence
// Description: Write-temp-then-rename helper shared by the registry and the
// run artifact store.
// Purpose: Guarantee a reader never observes a partially written JSON file.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Every durable write in this crate goes through [`write_json_atomic`]:
//! serialize, write to a sibling `.tmp` path, `sync_all`, then `rename`
//! over the destination. A crash between the write and the rename leaves
//! the destination untouched; a crash after the rename leaves it fully
//! written. Nothing in this crate ever writes a destination file directly.

use std::fs;
use std::io::Write;
use std::path::Path;

/// Writes `value` to `path` as pretty JSON, atomically.
///
/// # Errors
///
/// Returns the underlying [`std::io::Error`] from creating the parent
/// directory, writing the temp file, syncing, serializing, or renaming.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_vec_pretty(value)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    let temp_path = path.with_extension("tmp");
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&temp_path)?;
    file.write_all(&contents)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Reads and deserializes a JSON file, returning `Ok(None)` when it does
/// not exist.
///
/// # Errors
///
/// Returns the underlying [`std::io::Error`] for any failure other than
/// "not found", or a deserialize error wrapped as
/// [`std::io::ErrorKind::InvalidData`].
pub fn read_json_opt<T: serde::de::DeserializeOwned>(path: &Path) -> std::io::Result<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
            Ok(Some(value))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_through_atomic_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("file.json");
        write_json_atomic(&path, &json!({"a": 1})).expect("write");
        let read: serde_json::Value = read_json_opt(&path).expect("read").expect("present");
        assert_eq!(read, json!({"a": 1}));
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.json");
        let read: Option<serde_json::Value> = read_json_opt(&path).expect("read");
        assert!(read.is_none());
    }

    #[test]
    fn no_temp_file_survives_a_successful_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("file.json");
        write_json_atomic(&path, &json!({"a": 1})).expect("write");
        assert!(!path.with_extension("tmp").exists());
    }
}
