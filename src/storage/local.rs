//! Local filesystem storage implementation.
//!
//! All keys live in one JSON document:
//!
//! ```text
//! {
//!   "updated_at": "2024-11-12T08:30:00Z",
//!   "values": { "last_notice_number": "150520259100" }
//! }
//! ```
//!
//! Writes go to a temp file which is then renamed over the original, so a
//! crash mid-write leaves the previous state intact.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::storage::KeyValueStore;

/// File name of the state document inside the storage directory.
pub const STATE_FILE: &str = "state.json";

/// On-disk layout of the state file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StateFile {
    /// Timestamp of the last write
    pub updated_at: Option<DateTime<Utc>>,
    /// Stored values by key
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// Key-value store backed by a JSON file.
pub struct LocalStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl LocalStore {
    /// Create a store using `state.json` inside the given directory.
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self::with_path(root_dir.as_ref().join(STATE_FILE))
    }

    /// Create a store backed by an explicit file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole state document, empty if the file does not exist.
    pub fn read_state(&self) -> Result<StateFile> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StateFile::default()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write bytes atomically (write to temp, then rename).
    fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_state()?.values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut state = self
            .read_state()
            .map_err(|e| AppError::persistence(key, e))?;
        state.values.insert(key.to_string(), value.to_string());
        state.updated_at = Some(Utc::now());

        let bytes = serde_json::to_vec_pretty(&state).map_err(|e| AppError::persistence(key, e))?;
        self.write_bytes(&bytes)
            .map_err(|e| AppError::persistence(key, e))?;

        log::debug!("Stored {} = {} in {}", key, value, self.path.display());
        Ok(())
    }
}
