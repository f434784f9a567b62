//! Workflow transition guard.

use crate::core::{BlockReason, WorkflowState};
use crate::error::FailOpen;
use crate::guards::GuardOutcome;
use crate::storage::StateStore;

/// Validates an attempted state write against the transition table.
pub struct StateGuard<'a> {
    store: &'a dyn StateStore,
}

impl<'a> StateGuard<'a> {
    pub fn new(store: &'a dyn StateStore) -> Self {
        Self { store }
    }

    /// The project's current state.
    ///
    /// A missing or unparseable record reads as `START`.
    pub fn current_state(&self) -> WorkflowState {
        self.store
            .load_state()
            .fail_open_default("failed to read state record")
            .map(|record| record.current())
            .unwrap_or_default()
    }

    /// Check a write of `attempted` against the stored current state.
    pub fn check(&self, attempted: &str) -> GuardOutcome {
        Self::evaluate(self.current_state(), attempted)
    }

    /// Check a transition from `current` to `attempted`.
    ///
    /// Writing the current state again always passes. An unrecognized state
    /// name never passes.
    pub fn evaluate(current: WorkflowState, attempted: &str) -> GuardOutcome {
        let allowed = WorkflowState::parse(attempted)
            .map(|next| current.can_transition_to(next))
            .unwrap_or(false);

        if allowed {
            GuardOutcome::Pass
        } else {
            GuardOutcome::Block(BlockReason::IllegalTransition {
                current,
                attempted: attempted.to_string(),
                valid_next: current.valid_next().to_vec(),
            })
        }
    }
}
