//! Gatekeeper - workflow governance for AI coding agents
//!
//! Gatekeeper sits between an agent harness and the project's workflow
//! files. It refuses illegal workflow transitions, refuses to mark a feature
//! tested without passing test evidence, a clean working tree and resolved
//! decisions, and keeps an embedding-searchable ledger of the decisions made
//! along the way.

pub mod cli;
pub mod config;
pub mod core;
pub mod embedding;
pub mod error;
pub mod guards;
pub mod hooks;
pub mod storage;
pub mod traces;
pub mod util;
pub mod vcs;

pub use config::Config;
pub use core::{
    BlockReason, Feature, FeatureList, GateEvent, Gatekeeper, GuardPolicy, StateRecord, Verdict,
    WorkflowState,
};
pub use embedding::{create_provider, EmbeddingMode, EmbeddingProvider};
pub use error::{GateError, Result};
pub use storage::{
    EvidenceStore, FeatureStore, FileEvidenceStore, FileFeatureStore, FileStateStore,
    FileTraceRepository, MemoryStore, StateStore, TraceRepository,
};
pub use traces::{DecisionTrace, Outcome, TraceCollection, TraceLedger, TraceStore};
pub use vcs::{GitStatus, VcsStatus};

// CLI commands
pub use cli::{
    InitCommand, OutcomeCommand, PendingCommand, QueryCommand, StatusCommand, StoreCommand,
    TransitionCommand,
};
