//! File-backed stores.
//!
//! Each store owns one JSON document. Writes go through
//! [`crate::util::atomic_write`] (temp file + rename). Small documents are
//! written pretty-printed; the trace collection is written compactly and
//! read under its own size limit.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::{FeatureList, StateRecord};
use crate::error::{GateError, Result};
use crate::storage::{EvidenceStore, FeatureStore, StateStore, TraceRepository};
use crate::traces::TraceCollection;
use crate::util::{atomic_write, read_optional, read_optional_within, MAX_COLLECTION_SIZE};

/// File name of the trace collection inside the trace directory.
pub const COLLECTION_FILE: &str = "collection.json";

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let Some(content) = read_optional(path)? else {
        return Ok(None);
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| GateError::serde(format!("{}: {}", path.display(), e)))
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, &json)
}

/// Workflow state record on disk.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn load_state(&self) -> Result<Option<StateRecord>> {
        load_json(&self.path)
    }

    fn save_state(&self, record: &StateRecord) -> Result<()> {
        save_json(&self.path, record)
    }
}

/// Feature ledger on disk.
#[derive(Debug, Clone)]
pub struct FileFeatureStore {
    path: PathBuf,
}

impl FileFeatureStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeatureStore for FileFeatureStore {
    fn load_features(&self) -> Result<Option<FeatureList>> {
        load_json(&self.path)
    }
}

/// Test evidence record on disk.
#[derive(Debug, Clone)]
pub struct FileEvidenceStore {
    path: PathBuf,
}

impl FileEvidenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EvidenceStore for FileEvidenceStore {
    fn load_evidence(&self) -> Result<Option<Value>> {
        load_json(&self.path)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Trace collection stored as `<dir>/collection.json`.
#[derive(Debug, Clone)]
pub struct FileTraceRepository {
    dir: PathBuf,
}

impl FileTraceRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the collection document.
    pub fn collection_path(&self) -> PathBuf {
        self.dir.join(COLLECTION_FILE)
    }
}

impl TraceRepository for FileTraceRepository {
    fn load_collection(&self) -> Result<Option<TraceCollection>> {
        let path = self.collection_path();
        let Some(content) = read_optional_within(&path, MAX_COLLECTION_SIZE)? else {
            return Ok(None);
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| GateError::serde(format!("{}: {}", path.display(), e)))
    }

    fn save_collection(&self, collection: &TraceCollection) -> Result<()> {
        let json = serde_json::to_string(collection)?;
        atomic_write(&self.collection_path(), &json)
    }

    fn location(&self) -> String {
        self.collection_path().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::tests::{
        test_state_store_roundtrip, test_trace_repository_roundtrip,
    };
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_state_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path().join("progress").join("state.json"));
        test_state_store_roundtrip(&store);
    }

    #[test]
    fn test_file_feature_store_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feature-list.json");
        let store = FileFeatureStore::new(&path);
        assert!(store.load_features().unwrap().is_none());

        fs::write(
            &path,
            r#"{"features": [{"id": "F-1", "title": "Login", "status": "in_progress"}]}"#,
        )
        .unwrap();
        let list = store.load_features().unwrap().unwrap();
        assert_eq!(list.features.len(), 1);
        assert_eq!(list.features[0].status, "in_progress");
    }

    #[test]
    fn test_file_trace_repository_roundtrip() {
        let dir = TempDir::new().unwrap();
        let repo = FileTraceRepository::new(dir.path().join("traces"));
        test_trace_repository_roundtrip(&repo);
        assert!(dir.path().join("traces").join("collection.json").exists());
    }

    #[test]
    fn test_large_collection_stays_readable() {
        use crate::traces::{DecisionTrace, Outcome, TraceMetadata};
        use crate::util::MAX_FILE_SIZE;

        let dir = TempDir::new().unwrap();
        let repo = FileTraceRepository::new(dir.path().join("traces"));
        let mut collection = TraceCollection::new(1024, "voyage-3");
        for i in 0..1700 {
            collection.traces.push(DecisionTrace {
                id: format!("trace_{:012}", i),
                embedding: (0..1024)
                    .map(|j| ((i * 31 + j * 17) % 1000) as f32 / -997.0)
                    .collect(),
                document: format!("decision {}", i),
                metadata: TraceMetadata {
                    timestamp: chrono::Utc::now(),
                    category: "design".into(),
                    decision: format!("decision {}", i),
                    outcome: Outcome::Pending,
                    session_id: None,
                    feature_id: None,
                    state: None,
                    project_dir: None,
                },
            });
        }
        repo.save_collection(&collection).unwrap();

        let size = fs::metadata(repo.collection_path()).unwrap().len();
        assert!(size > MAX_FILE_SIZE, "collection is only {} bytes", size);

        let loaded = repo.load_collection().unwrap().unwrap();
        assert_eq!(loaded.len(), 1700);
        assert_eq!(loaded.pending().count(), 1700);
    }

    #[test]
    fn test_collection_written_compactly() {
        let dir = TempDir::new().unwrap();
        let repo = FileTraceRepository::new(dir.path().join("traces"));
        repo.save_collection(&TraceCollection::new(4, "m")).unwrap();

        let content = fs::read_to_string(repo.collection_path()).unwrap();
        assert!(!content.contains('\n'));
        assert!(content.contains("\"dimension\":4"));
    }

    #[test]
    fn test_malformed_state_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let err = FileStateStore::new(&path).load_state().unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().contains("state.json"));
    }

    #[test]
    fn test_evidence_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        let store = FileEvidenceStore::new(&path);

        assert!(store.load_evidence().unwrap().is_none());
        assert!(store.location().ends_with("results.json"));

        fs::write(&path, r#"{"all_passed": true, "total": 12}"#).unwrap();
        let evidence = store.load_evidence().unwrap().unwrap();
        assert_eq!(evidence["all_passed"], true);

        fs::write(&path, "PASS").unwrap();
        assert!(store.load_evidence().unwrap_err().is_parse_error());
    }

    #[test]
    fn test_save_state_is_pretty_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let store = FileStateStore::new(&path);

        store
            .save_state(&StateRecord::new(crate::core::WorkflowState::Test))
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"state\": \"TEST\""));
        assert_eq!(store.path(), path.as_path());
    }
}
