//! Write-only remote document store for shift snapshots
//!
//! The transport is out of scope here; [`SnapshotSink`] is the seam a
//! network client plugs into.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::report::ShiftSnapshot;

pub trait SnapshotSink {
    /// Write `snapshot` under `key`, replacing any previous document
    fn write_snapshot(&mut self, key: &str, snapshot: &ShiftSnapshot) -> Result<(), StorageError>;
}

/// Keeps published documents in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: BTreeMap<String, ShiftSnapshot>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ShiftSnapshot> {
        self.documents.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }
}

impl SnapshotSink for MemorySink {
    fn write_snapshot(&mut self, key: &str, snapshot: &ShiftSnapshot) -> Result<(), StorageError> {
        self.documents.insert(key.to_string(), snapshot.clone());
        Ok(())
    }
}

/// Writes each document as pretty JSON to `{dir}/{key}.json`
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotSink for JsonDirSink {
    fn write_snapshot(&mut self, key: &str, snapshot: &ShiftSnapshot) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(self.path_for(key), json)?;
        log::info!("Published shift snapshot '{key}'");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Shift;
    use chrono::{NaiveDate, Utc};

    fn snapshot() -> ShiftSnapshot {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        ShiftSnapshot::build("default", date, Shift::Day, None, &[], &[], Utc::now())
    }

    #[test]
    fn test_memory_sink_replaces() {
        let mut sink = MemorySink::new();
        let snap = snapshot();
        sink.write_snapshot(&snap.key(), &snap).unwrap();
        sink.write_snapshot(&snap.key(), &snap).unwrap();
        assert_eq!(sink.keys().collect::<Vec<_>>(), vec!["default-2024-01-02-day"]);
        assert_eq!(sink.get("default-2024-01-02-day"), Some(&snap));
    }

    #[test]
    fn test_json_dir_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonDirSink::new(dir.path().join("snapshots")).unwrap();
        let snap = snapshot();
        sink.write_snapshot(&snap.key(), &snap).unwrap();

        let text = std::fs::read_to_string(sink.path_for(&snap.key())).unwrap();
        let back: ShiftSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back, snap);
    }
}
