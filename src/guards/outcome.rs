//! Resolved decision traces precondition.

use std::path::Path;

use crate::core::BlockReason;
use crate::guards::{GuardOutcome, PreconditionGuard};
use crate::storage::TraceRepository;

/// Requires every decision trace in the project to have an outcome.
///
/// Inert when the project has no trace ledger. A ledger that cannot be
/// parsed passes unless strict; one that cannot be read at all blocks.
pub struct OutcomeGuard<'a> {
    repo: &'a dyn TraceRepository,
    strict: bool,
}

impl<'a> OutcomeGuard<'a> {
    pub fn new(repo: &'a dyn TraceRepository, strict: bool) -> Self {
        Self { repo, strict }
    }
}

impl PreconditionGuard for OutcomeGuard<'_> {
    fn name(&self) -> &'static str {
        "outcome"
    }

    fn check(&self, _cwd: &Path) -> GuardOutcome {
        let collection = match self.repo.load_collection() {
            Ok(Some(collection)) => collection,
            Ok(None) => return GuardOutcome::Pass,
            Err(e) if self.strict || !e.is_parse_error() => {
                return GuardOutcome::Block(BlockReason::UnreadableLedger {
                    path: self.repo.location(),
                    detail: e.to_string(),
                })
            }
            Err(e) => {
                tracing::warn!(
                    "cannot read trace ledger {}: {} (fail-open)",
                    self.repo.location(),
                    e
                );
                return GuardOutcome::Pass;
            }
        };

        let count = collection.pending().count();
        if count > 0 {
            GuardOutcome::Block(BlockReason::PendingTraces { count })
        } else {
            GuardOutcome::Pass
        }
    }
}
