//! File system paths for PlayUR services.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory name under the platform data directory.
const APP_DIR_NAME: &str = "playur";

/// Application-private storage locations.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory (`<data dir>/playur`).
    base_dir: PathBuf,
}

impl Paths {
    /// Resolve paths under the platform data directory
    /// (`~/.local/share/playur`, `~/Library/Application Support/playur`, ...).
    pub fn new() -> CoreResult<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| CoreError::Path("Could not determine data directory".to_string()))?;

        Ok(Self {
            base_dir: data_dir.join(APP_DIR_NAME),
        })
    }

    /// Create a Paths instance rooted at a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// `<base>/config.json`
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// `<base>/sessions`, where queue snapshots are written.
    pub fn sessions_dir(&self) -> PathBuf {
        self.base_dir.join("sessions")
    }

    /// Full path of a snapshot file with the given name.
    pub fn snapshot_file(&self, file_name: &str) -> PathBuf {
        self.sessions_dir().join(file_name)
    }

    /// `<base>/logs`
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// JSONL log file for a service (`<base>/logs/<service>.jsonl`).
    pub fn log_file(&self, service_name: &str) -> PathBuf {
        self.logs_dir().join(format!("{}.jsonl", service_name))
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.sessions_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
