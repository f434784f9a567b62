//! Core types and logic for gatekeeper.
//!
//! This module contains the workflow state machine, the feature ledger
//! types, event decoding, verdicts, and the orchestrator that ties the
//! guards together.

pub mod event;
pub mod feature;
pub mod gatekeeper;
pub mod verdict;
pub mod workflow;

pub use event::GateEvent;
pub use feature::{Feature, FeatureList};
pub use gatekeeper::{Gatekeeper, GuardPolicy};
pub use verdict::{BlockReason, Verdict};
pub use workflow::{StateRecord, WorkflowState};
