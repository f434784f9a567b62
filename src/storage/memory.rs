//! In-memory stores for testing.
//!
//! [`MemoryStore`] implements every store trait over raw JSON strings, so
//! tests can seed malformed documents exactly as they would appear on disk.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::{FeatureList, StateRecord};
use crate::error::{GateError, Result};
use crate::storage::{EvidenceStore, FeatureStore, StateStore, TraceRepository};
use crate::traces::TraceCollection;

/// One in-memory JSON document.
#[derive(Debug, Default)]
struct Document {
    raw: RwLock<Option<String>>,
}

impl Document {
    fn read(&self) -> RwLockReadGuard<'_, Option<String>> {
        self.raw.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<String>> {
        self.raw.write().unwrap_or_else(|e| e.into_inner())
    }

    fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.read().as_deref() {
            None => Ok(None),
            Some(raw) => serde_json::from_str(raw).map(Some).map_err(Into::into),
        }
    }

    fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        *self.write() = Some(json);
        Ok(())
    }

    fn set_raw(&self, raw: Option<String>) {
        *self.write() = raw;
    }
}

/// Thread-safe in-memory implementation of all store traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Document,
    features: Document,
    evidence: Document,
    collection: Document,
    /// When set, trace saves fail with a storage error.
    fail_trace_writes: RwLock<bool>,
}

impl MemoryStore {
    /// Create an empty store. Every document starts absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the state record with raw JSON.
    pub fn with_state(self, raw: &str) -> Self {
        self.state.set_raw(Some(raw.to_string()));
        self
    }

    /// Seed the feature ledger with raw JSON.
    pub fn with_features(self, raw: &str) -> Self {
        self.features.set_raw(Some(raw.to_string()));
        self
    }

    /// Seed the evidence record with raw JSON.
    pub fn with_evidence(self, raw: &str) -> Self {
        self.evidence.set_raw(Some(raw.to_string()));
        self
    }

    /// Seed the trace collection with raw JSON.
    pub fn with_collection(self, raw: &str) -> Self {
        self.collection.set_raw(Some(raw.to_string()));
        self
    }

    /// Make every subsequent trace save fail.
    pub fn failing_trace_writes(self) -> Self {
        *self
            .fail_trace_writes
            .write()
            .unwrap_or_else(|e| e.into_inner()) = true;
        self
    }

    /// Remove the evidence record.
    pub fn clear_evidence(&self) {
        self.evidence.set_raw(None);
    }

    /// Raw JSON of the state record, if any.
    pub fn raw_state(&self) -> Option<String> {
        self.state.read().clone()
    }
}

impl StateStore for MemoryStore {
    fn load_state(&self) -> Result<Option<StateRecord>> {
        self.state.load()
    }

    fn save_state(&self, record: &StateRecord) -> Result<()> {
        self.state.save(record)
    }
}

impl FeatureStore for MemoryStore {
    fn load_features(&self) -> Result<Option<FeatureList>> {
        self.features.load()
    }
}

impl EvidenceStore for MemoryStore {
    fn load_evidence(&self) -> Result<Option<Value>> {
        self.evidence.load()
    }

    fn location(&self) -> String {
        "memory://evidence".to_string()
    }
}

impl TraceRepository for MemoryStore {
    fn load_collection(&self) -> Result<Option<TraceCollection>> {
        self.collection.load()
    }

    fn save_collection(&self, collection: &TraceCollection) -> Result<()> {
        if *self
            .fail_trace_writes
            .read()
            .unwrap_or_else(|e| e.into_inner())
        {
            return Err(GateError::storage(
                "memory://traces",
                std::io::Error::other("trace writes disabled"),
            ));
        }
        self.collection.save(collection)
    }

    fn location(&self) -> String {
        "memory://traces".to_string()
    }
}
