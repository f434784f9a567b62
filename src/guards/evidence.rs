//! Test evidence precondition.

use std::path::Path;

use serde_json::Value;

use crate::core::BlockReason;
use crate::guards::{GuardOutcome, PreconditionGuard};
use crate::storage::EvidenceStore;

/// Requires a passing test evidence record.
pub struct EvidenceGuard<'a> {
    store: &'a dyn EvidenceStore,
}

impl<'a> EvidenceGuard<'a> {
    pub fn new(store: &'a dyn EvidenceStore) -> Self {
        Self { store }
    }
}

impl PreconditionGuard for EvidenceGuard<'_> {
    fn name(&self) -> &'static str {
        "evidence"
    }

    fn check(&self, _cwd: &Path) -> GuardOutcome {
        let path = self.store.location();
        let evidence = match self.store.load_evidence() {
            Ok(Some(value)) => value,
            Ok(None) => return GuardOutcome::Block(BlockReason::MissingEvidence { path }),
            Err(e) => {
                return GuardOutcome::Block(BlockReason::UnreadableEvidence {
                    path,
                    detail: e.to_string(),
                })
            }
        };

        if !evidence.is_object() {
            return GuardOutcome::Block(BlockReason::UnreadableEvidence {
                path,
                detail: "expected a JSON object with an \"all_passed\" field".to_string(),
            });
        }

        // A missing flag counts as not passed.
        if evidence.get("all_passed").and_then(Value::as_bool) == Some(true) {
            GuardOutcome::Pass
        } else {
            GuardOutcome::Block(BlockReason::TestsFailed { evidence })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn check(store: &MemoryStore) -> GuardOutcome {
        EvidenceGuard::new(store).check(Path::new("/"))
    }

    #[test]
    fn test_missing_evidence_blocks() {
        assert!(matches!(
            check(&MemoryStore::new()),
            GuardOutcome::Block(BlockReason::MissingEvidence { .. })
        ));
    }

    #[test]
    fn test_unparseable_evidence_blocks() {
        assert!(matches!(
            check(&MemoryStore::new().with_evidence("PASSED")),
            GuardOutcome::Block(BlockReason::UnreadableEvidence { .. })
        ));
        assert!(matches!(
            check(&MemoryStore::new().with_evidence("[true]")),
            GuardOutcome::Block(BlockReason::UnreadableEvidence { .. })
        ));
    }

    #[test]
    fn test_failed_tests_block_and_echo() {
        let store = MemoryStore::new().with_evidence(r#"{"all_passed": false, "failed": 2}"#);
        match check(&store) {
            GuardOutcome::Block(BlockReason::TestsFailed { evidence }) => {
                assert_eq!(evidence["failed"], 2);
            }
            other => panic!("expected TestsFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_flag_blocks() {
        let store = MemoryStore::new().with_evidence(r#"{"total": 10}"#);
        assert!(!check(&store).is_pass());
    }

    #[test]
    fn test_passing_evidence() {
        let store = MemoryStore::new().with_evidence(r#"{"all_passed": true, "total": 10}"#);
        assert!(check(&store).is_pass());
    }
}
