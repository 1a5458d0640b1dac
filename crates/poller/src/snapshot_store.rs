//! Timestamped snapshot records on disk.
//!
//! Each successful cycle writes `license_usage_YYYYMMDD_HHMMSS_ffffff.json`
//! into the data directory. Records are never overwritten: a name already
//! taken gets a `_NN` suffix. Names sort chronologically, so the newest
//! record is the greatest file name.

use std::path::{Path, PathBuf};

use licmon_core::snapshot::UsageSnapshot;
use tokio::io::AsyncWriteExt;

const RECORD_PREFIX: &str = "license_usage_";
const RECORD_SUFFIX: &str = ".json";
const RECORD_TIME_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

/// Error type for the configuration and snapshot stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Directory of snapshot records.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Record path for a snapshot captured at `snapshot.captured_at`.
    pub fn record_path(&self, snapshot: &UsageSnapshot) -> PathBuf {
        self.numbered_path(snapshot, 0)
    }

    fn numbered_path(&self, snapshot: &UsageSnapshot, n: u32) -> PathBuf {
        let stamp = snapshot.captured_at.format(RECORD_TIME_FORMAT);
        if n == 0 {
            self.dir.join(format!("{RECORD_PREFIX}{stamp}{RECORD_SUFFIX}"))
        } else {
            self.dir.join(format!("{RECORD_PREFIX}{stamp}_{n:02}{RECORD_SUFFIX}"))
        }
    }

    /// Write `snapshot` as a new pretty-printed record and return its path.
    pub async fn persist(&self, snapshot: &UsageSnapshot) -> Result<PathBuf, StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| StoreError::json(&self.record_path(snapshot), e))?;

        let mut n = 0;
        let (path, mut file) = loop {
            let path = self.numbered_path(snapshot, n);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        };

        file.write_all(&json)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        file.flush().await.map_err(|e| StoreError::io(&path, e))?;

        tracing::debug!(path = %path.display(), "Snapshot record written");
        Ok(path)
    }

    /// Read one record.
    pub async fn load(&self, path: &Path) -> Result<UsageSnapshot, StoreError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::io(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::json(path, e))
    }

    /// The newest record, or `None` when the directory holds none.
    pub async fn latest(&self) -> Result<Option<UsageSnapshot>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut newest: Option<String> = None;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !is_record_name(&name) {
                continue;
            }
            if newest.as_deref().map_or(true, |current| name.as_str() > current) {
                newest = Some(name);
            }
        }

        match newest {
            Some(name) => self.load(&self.dir.join(name)).await.map(Some),
            None => Ok(None),
        }
    }
}

fn is_record_name(name: &str) -> bool {
    name.starts_with(RECORD_PREFIX) && name.ends_with(RECORD_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn snapshot_at(h: u32, m: u32, s: u32) -> UsageSnapshot {
        let mut snapshot = UsageSnapshot::new(
            "10.0.60.60",
            json!({"License Clients License Usage for pool default": [{"Hostname": "ap-01", "AP": "3"}]}),
            None,
        )
        .unwrap();
        snapshot.captured_at = chrono::Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap();
        snapshot
    }

    #[test]
    fn record_name_is_timestamped() {
        let store = SnapshotStore::new("/data");
        assert_eq!(
            store.record_path(&snapshot_at(8, 5, 9)),
            PathBuf::from("/data/license_usage_20240301_080509_000000.json")
        );
        assert!(is_record_name("license_usage_20240301_080509_000000.json"));
        assert!(!is_record_name("config.json"));
    }

    #[tokio::test]
    async fn latest_picks_newest_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store.persist(&snapshot_at(9, 0, 0)).await.unwrap();
        let newest = snapshot_at(10, 0, 0);
        store.persist(&newest).await.unwrap();
        store.persist(&snapshot_at(8, 0, 0)).await.unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();

        assert_eq!(store.latest().await.unwrap(), Some(newest));
    }

    #[tokio::test]
    async fn same_timestamp_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let first = store.persist(&snapshot_at(9, 0, 0)).await.unwrap();
        let second = store.persist(&snapshot_at(9, 0, 0)).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(
            second.file_name().unwrap(),
            "license_usage_20240301_090000_000000_01.json"
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
        // The suffixed record is the newer one.
        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest, store.load(&second).await.unwrap());
    }

    #[tokio::test]
    async fn missing_directory_has_no_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("absent"));
        assert_eq!(store.latest().await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_record_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license_usage_20240301_080000_000000.json");
        std::fs::write(&path, "not json").unwrap();

        let err = SnapshotStore::new(dir.path()).load(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }
}
