//! The monitor configuration file.

use std::path::{Path, PathBuf};

use licmon_core::config::MonitorConfig;

use crate::snapshot_store::StoreError;

/// File name of the configuration inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// `config.json` in the data directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(CONFIG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration. A missing or unreadable file yields the
    /// defaults; the problem is logged.
    pub async fn load(&self) -> MonitorConfig {
        match self.try_load().await {
            Ok(Some(config)) => {
                tracing::info!(path = %self.path.display(), "Configuration loaded");
                config
            }
            Ok(None) => {
                tracing::info!(path = %self.path.display(), "No configuration file, using defaults");
                MonitorConfig::default()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration, using defaults");
                MonitorConfig::default()
            }
        }
    }

    /// Load the configuration, `Ok(None)` when the file does not exist.
    pub async fn try_load(&self) -> Result<Option<MonitorConfig>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::json(&self.path, e))
    }

    /// Write `config` pretty-printed. The file is replaced atomically via
    /// a temporary sibling and a rename.
    pub async fn save(&self, config: &MonitorConfig) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::io(dir, e))?;
        }

        let json =
            serde_json::to_vec_pretty(config).map_err(|e| StoreError::json(&self.path, e))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        tracing::info!(path = %self.path.display(), "Configuration saved");
        Ok(())
    }
}
