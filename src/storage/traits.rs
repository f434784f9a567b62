//! Storage traits for the governed files.
//!
//! Every store follows the same load/save contract:
//! - `load_*` returns `Ok(None)` when the backing document does not exist,
//!   `Err(GateError::Serde)` when it exists but cannot be parsed, and
//!   `Err(GateError::Storage)` when it cannot be read at all.
//! - `save_*` replaces the whole document. The feature ledger and the
//!   evidence record are only ever read.
//!
//! # Concurrency
//!
//! Stores assume a single writer. Saves are atomic (readers never observe a
//! half-written document) but a load-modify-save sequence is not isolated:
//! two overlapping invocations can each read the same document and the
//! later save wins. Callers that need stronger guarantees must serialize
//! access themselves.

use serde_json::Value;

use crate::core::{FeatureList, StateRecord};
use crate::error::Result;
use crate::traces::TraceCollection;

/// Persistence for the workflow state record.
pub trait StateStore: Send + Sync {
    /// Load the state record.
    fn load_state(&self) -> Result<Option<StateRecord>>;

    /// Replace the state record.
    fn save_state(&self, record: &StateRecord) -> Result<()>;
}

/// Read-only access to the feature ledger. The harness owns its writes.
pub trait FeatureStore: Send + Sync {
    /// Load the feature list.
    fn load_features(&self) -> Result<Option<FeatureList>>;
}

/// Read-only access to the test evidence record.
pub trait EvidenceStore: Send + Sync {
    /// Load the evidence record as raw JSON.
    fn load_evidence(&self) -> Result<Option<Value>>;

    /// Human-readable location, used in diagnostics.
    fn location(&self) -> String;
}

/// Persistence for the trace collection.
pub trait TraceRepository: Send + Sync {
    /// Load the collection.
    fn load_collection(&self) -> Result<Option<TraceCollection>>;

    /// Replace the collection.
    fn save_collection(&self, collection: &TraceCollection) -> Result<()>;

    /// Human-readable location, used in diagnostics.
    fn location(&self) -> String;
}

/// Test utilities for store implementations.
#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::core::WorkflowState;

    /// Verify the state store load/save contract.
    pub fn test_state_store_roundtrip<S: StateStore>(store: &S) {
        assert!(store.load_state().unwrap().is_none());

        let mut record = StateRecord::new(WorkflowState::Init);
        record
            .extra
            .insert("session_id".into(), Value::String("s-1".into()));
        store.save_state(&record).unwrap();

        let loaded = store.load_state().unwrap().unwrap();
        assert_eq!(loaded.current(), WorkflowState::Init);
        assert_eq!(loaded.extra_str("session_id"), Some("s-1"));

        record.set(WorkflowState::Implement);
        store.save_state(&record).unwrap();
        assert_eq!(
            store.load_state().unwrap().unwrap().current(),
            WorkflowState::Implement
        );
    }

    /// Verify the trace repository load/save contract.
    pub fn test_trace_repository_roundtrip<R: TraceRepository>(repo: &R) {
        assert!(repo.load_collection().unwrap().is_none());

        let collection = TraceCollection::new(4, "voyage-3");
        repo.save_collection(&collection).unwrap();

        let loaded = repo.load_collection().unwrap().unwrap();
        assert_eq!(loaded.dimension, 4);
        assert_eq!(loaded.model, "voyage-3");
        assert!(loaded.is_empty());
        assert!(!repo.location().is_empty());
    }
}
