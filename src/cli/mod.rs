//! CLI commands for gatekeeper.
//!
//! Commands are organized into:
//! - **Trace commands**: init, store, query, outcome, pending
//! - **Workflow commands**: status, transition
//! - **Hook command**: hook (harness integration, see [`crate::hooks`])
//!
//! Each command returns a serializable output struct and formats it as
//! human-readable text or JSON.

use crate::embedding::EmbeddingProvider;
use crate::error::Result;

// Trace commands
pub mod init;
pub mod outcome;
pub mod pending;
pub mod query;
pub mod store;

// Workflow commands
pub mod status;
pub mod transition;

pub use init::InitCommand;
pub use outcome::OutcomeCommand;
pub use pending::PendingCommand;
pub use query::QueryCommand;
pub use status::StatusCommand;
pub use store::StoreCommand;
pub use transition::TransitionCommand;

/// Builds the embedding provider on demand.
///
/// Commands only call it once they know they need vectors, so a missing
/// credential does not fail a query against an empty collection.
pub type ProviderFactory<'a> = &'a dyn Fn() -> Result<Box<dyn EmbeddingProvider>>;
