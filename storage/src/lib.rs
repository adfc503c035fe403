//! Spice Tracker Storage Layer - File-Based Snapshots
//!
//! The ledger lives in memory; state is persisted as named snapshots
//! (ledger, treasury, configuration) written on demand and loaded on
//! startup. Each snapshot is written twice: JSON for a human-readable
//! backup, bincode for fast loading.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Snapshot names used by the tracker service.
pub const LEDGER_SNAPSHOT: &str = "ledger";
pub const EXPEDITIONS_SNAPSHOT: &str = "expeditions";
pub const TREASURY_SNAPSHOT: &str = "treasury";
pub const CONFIG_SNAPSHOT: &str = "config";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Snapshot not found: {0}")]
    NotFound(String),
}

/// File-based snapshot storage for tracker state.
pub struct SnapshotStore {
    data_dir: PathBuf,
}

impl SnapshotStore {
    /// Open the storage directory, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let data_dir = path.as_ref().to_path_buf();
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)?;
        }
        Ok(Self { data_dir })
    }

    /// Save a snapshot under `name` in both formats.
    pub fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        fs::write(self.data_dir.join(format!("{name}.json")), json)?;

        let bin = bincode::serialize(data)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        fs::write(self.data_dir.join(format!("{name}.bin")), bin)?;

        Ok(())
    }

    /// Load a snapshot (bincode preferred, JSON fallback).
    pub fn load<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<T, SnapshotError> {
        let bin_path = self.data_dir.join(format!("{name}.bin"));
        if bin_path.exists() {
            let data = fs::read(&bin_path)?;
            return bincode::deserialize(&data)
                .map_err(|e| SnapshotError::Serialization(e.to_string()));
        }

        let json_path = self.data_dir.join(format!("{name}.json"));
        if json_path.exists() {
            let data = fs::read_to_string(&json_path)?;
            return serde_json::from_str(&data)
                .map_err(|e| SnapshotError::Serialization(e.to_string()));
        }

        Err(SnapshotError::NotFound(name.to_string()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.data_dir.join(format!("{name}.bin")).exists()
            || self.data_dir.join(format!("{name}.json")).exists()
    }

    /// Delete both files of a snapshot, if present.
    pub fn delete(&self, name: &str) -> Result<(), SnapshotError> {
        for ext in ["bin", "json"] {
            let path = self.data_dir.join(format!("{name}.{ext}"));
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
