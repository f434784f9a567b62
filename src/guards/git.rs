//! Clean working tree precondition.

use std::path::Path;

use crate::core::BlockReason;
use crate::guards::{GuardOutcome, PreconditionGuard};
use crate::vcs::VcsStatus;

/// Requires a clean working tree. Passes when status cannot be determined.
pub struct GitHygieneGuard<'a> {
    vcs: &'a dyn VcsStatus,
    max_paths: usize,
}

impl<'a> GitHygieneGuard<'a> {
    pub fn new(vcs: &'a dyn VcsStatus, max_paths: usize) -> Self {
        Self { vcs, max_paths }
    }
}

impl PreconditionGuard for GitHygieneGuard<'_> {
    fn name(&self) -> &'static str {
        "git"
    }

    fn check(&self, cwd: &Path) -> GuardOutcome {
        let lines = match self.vcs.porcelain_status(cwd) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!("git status unavailable in {}: {} (fail-open)", cwd.display(), e);
                return GuardOutcome::Pass;
            }
        };

        if lines.is_empty() {
            return GuardOutcome::Pass;
        }

        let total = lines.len();
        let paths = lines.into_iter().take(self.max_paths).collect();
        GuardOutcome::Block(BlockReason::DirtyWorkingTree { paths, total })
    }
}
