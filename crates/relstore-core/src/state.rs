//! The persistence collaborator: a flat `version -> key/value` state
//! file behind a small trait so the store can be exercised against
//! other backings in tests.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// One flattened release record: dot-joined field path to scalar.
pub type FlatRecord = BTreeMap<String, String>;

/// The whole persisted state: canonical version string to flat record.
pub type FlatState = BTreeMap<String, FlatRecord>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("State file {path} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load/save of the flat state. Both operations fail fast and propagate
/// storage errors unchanged; there is no retry policy here.
pub trait StateStore {
    /// Reads the whole state. A missing backing file is the legitimate
    /// empty initial state, not an error.
    fn load(&self, path: &Path) -> Result<FlatState, StorageError>;

    /// Writes the whole state, replacing whatever was there before.
    fn save(&self, state: &FlatState, path: &Path) -> Result<(), StorageError>;
}

/// State file stored as a JSON object of objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStateFile;

impl StateStore for JsonStateFile {
    fn load(&self, path: &Path) -> Result<FlatState, StorageError> {
        if !path.exists() {
            log::debug!("No state file at {}, starting empty", path.display());
            return Ok(FlatState::new());
        }
        let content = fs::read_to_string(path).map_err(|source| StorageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StorageError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    fn save(&self, state: &FlatState, path: &Path) -> Result<(), StorageError> {
        let write_error = |source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let content =
            serde_json::to_string_pretty(state).expect("string maps serialize infallibly");
        fs::write(path, content).map_err(write_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_empty_state() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let state = JsonStateFile
            .load(&temp_dir.path().join("absent.json"))
            .expect("missing file is not an error");
        assert!(state.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let path = temp_dir.path().join("state.json");

        let mut record = FlatRecord::new();
        record.insert("documentation".to_string(), "/doc/1.55.0/".to_string());
        let mut state = FlatState::new();
        state.insert("1.55.0".to_string(), record);

        JsonStateFile.save(&state, &path).expect("save succeeds");
        let loaded = JsonStateFile.load(&path).expect("load succeeds");
        assert_eq!(loaded, state);
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let path = temp_dir.path().join("nested").join("state.json");

        JsonStateFile
            .save(&FlatState::new(), &path)
            .expect("save creates parents");
        assert!(path.exists());
    }

    #[test]
    fn malformed_json_is_a_storage_error() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let path = temp_dir.path().join("state.json");
        fs::write(&path, "not json").expect("write test file");

        let result = JsonStateFile.load(&path);
        assert!(matches!(result, Err(StorageError::Malformed { .. })));
    }
}
