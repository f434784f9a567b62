//! Guards that can veto an attempted write.
//!
//! [`StateGuard`] validates workflow transitions. The remaining guards are
//! preconditions for marking a feature tested and share the
//! [`PreconditionGuard`] interface so the orchestrator can run them as an
//! ordered, short-circuiting chain.
//!
//! Fail-open cases: an unparseable state record reads as `START`, an
//! unavailable VCS passes the git check, and an unparseable trace ledger
//! passes the outcome check unless the policy is strict. A ledger that
//! cannot be read at all (I/O error, over the size limit) always blocks.

pub mod evidence;
pub mod git;
pub mod outcome;
pub mod state;

use std::path::Path;

use crate::core::BlockReason;

pub use evidence::EvidenceGuard;
pub use git::GitHygieneGuard;
pub use outcome::OutcomeGuard;
pub use state::StateGuard;

/// Result of a single guard.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    Pass,
    Block(BlockReason),
}

impl GuardOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// A precondition checked before a feature may be marked tested.
pub trait PreconditionGuard {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Check the precondition for the working directory `cwd`.
    fn check(&self, cwd: &Path) -> GuardOutcome;
}

/// Run guards in order, stopping at the first block.
pub fn run_chain(guards: &[&dyn PreconditionGuard], cwd: &Path) -> GuardOutcome {
    for guard in guards {
        let outcome = guard.check(cwd);
        if let GuardOutcome::Block(reason) = outcome {
            tracing::info!(guard = guard.name(), kind = reason.kind(), "guard blocked");
            return GuardOutcome::Block(reason);
        }
        tracing::debug!(guard = guard.name(), "guard passed");
    }
    GuardOutcome::Pass
}
