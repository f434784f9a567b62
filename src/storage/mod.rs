//! Persistence for the state record, feature ledger, evidence record, and
//! trace collection, with file-based and in-memory backends.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::{FileEvidenceStore, FileFeatureStore, FileStateStore, FileTraceRepository};
pub use memory::MemoryStore;
pub use traits::{EvidenceStore, FeatureStore, StateStore, TraceRepository};
