//! The gatekeeper: routes an intercepted write to the guards that govern it.
//!
//! Routing by event shape:
//! - a state write runs the transition guard; a legal move into `COMPLETE`
//!   must also have passing test evidence,
//! - a feature write that marks something tested runs the evidence, git and
//!   outcome guards in that order, stopping at the first block; entries
//!   marked tested without a `last_commit` turn a pass into an advisory,
//! - a malformed payload is allowed unless the policy is strict,
//! - everything else is allowed.
//!
//! After a successful feature write the runner may ask for the newest
//! untraced feature and record a pending trace for it.

use std::path::Path;

use crate::config::GuardConfig;
use crate::core::event::GateEvent;
use crate::core::feature::Feature;
use crate::core::verdict::{BlockReason, Verdict};
use crate::core::workflow::WorkflowState;
use crate::embedding::EmbeddingProvider;
use crate::error::{FailOpen, Result};
use crate::guards::{
    run_chain, EvidenceGuard, GitHygieneGuard, GuardOutcome, OutcomeGuard, PreconditionGuard,
    StateGuard,
};
use crate::storage::{EvidenceStore, FeatureStore, StateStore, TraceRepository};
use crate::traces::{
    Outcome, StoreRequest, TraceContext, TraceLedger, TraceStore, FEATURE_CATEGORY,
};
use crate::vcs::VcsStatus;

/// Policy knobs for guard evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardPolicy {
    /// Block on payloads and ledgers that cannot be interpreted.
    pub strict: bool,
    /// Dirty paths listed in a git block.
    pub max_dirty_paths: usize,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            strict: false,
            max_dirty_paths: 5,
        }
    }
}

impl From<&GuardConfig> for GuardPolicy {
    fn from(config: &GuardConfig) -> Self {
        Self {
            strict: config.strict,
            max_dirty_paths: config.max_dirty_paths,
        }
    }
}

/// Text recorded for an automatic feature trace.
pub fn feature_decision(title: &str) -> String {
    format!("Feature created: {}", title)
}

/// Guard orchestrator over injected stores.
pub struct Gatekeeper<'a> {
    state: &'a dyn StateStore,
    features: &'a dyn FeatureStore,
    evidence: &'a dyn EvidenceStore,
    vcs: &'a dyn VcsStatus,
    traces: &'a dyn TraceRepository,
    policy: GuardPolicy,
}

impl<'a> Gatekeeper<'a> {
    pub fn new(
        state: &'a dyn StateStore,
        features: &'a dyn FeatureStore,
        evidence: &'a dyn EvidenceStore,
        vcs: &'a dyn VcsStatus,
        traces: &'a dyn TraceRepository,
        policy: GuardPolicy,
    ) -> Self {
        Self {
            state,
            features,
            evidence,
            vcs,
            traces,
            policy,
        }
    }

    /// Decode a payload and evaluate it.
    pub fn evaluate_payload(&self, payload: &str, cwd: &Path) -> Verdict {
        self.evaluate(&GateEvent::decode(payload), cwd)
    }

    /// Evaluate a decoded event before the write happens.
    pub fn evaluate(&self, event: &GateEvent, cwd: &Path) -> Verdict {
        tracing::debug!(kind = event.kind(), "evaluating event");
        match event {
            GateEvent::StateWrite { attempted } => self.evaluate_state_write(attempted, cwd),
            GateEvent::FeatureWrite {
                marks_tested: true,
                uncommitted,
                ..
            } => self.evaluate_tested(uncommitted, cwd),
            GateEvent::Malformed { reason } => {
                if self.policy.strict {
                    Verdict::block(BlockReason::MalformedPayload {
                        reason: reason.clone(),
                    })
                } else {
                    tracing::warn!("cannot interpret payload: {} (fail-open)", reason);
                    Verdict::Allow
                }
            }
            GateEvent::FeatureWrite { .. } | GateEvent::Other => Verdict::Allow,
        }
    }

    fn evaluate_state_write(&self, attempted: &str, cwd: &Path) -> Verdict {
        let state_guard = StateGuard::new(self.state);
        if let GuardOutcome::Block(reason) = state_guard.check(attempted) {
            return Verdict::block(reason);
        }

        let completing = WorkflowState::parse(attempted) == Some(WorkflowState::Complete)
            && state_guard.current_state() != WorkflowState::Complete;
        if completing {
            let evidence = EvidenceGuard::new(self.evidence);
            if let GuardOutcome::Block(reason) = evidence.check(cwd) {
                return Verdict::block(reason);
            }
        }

        Verdict::Allow
    }

    /// Run the tested chain. A pass with entries lacking `last_commit` is
    /// an advisory.
    fn evaluate_tested(&self, uncommitted: &[String], cwd: &Path) -> Verdict {
        let evidence = EvidenceGuard::new(self.evidence);
        let git = GitHygieneGuard::new(self.vcs, self.policy.max_dirty_paths);
        let outcome = OutcomeGuard::new(self.traces, self.policy.strict);
        let chain: [&dyn PreconditionGuard; 3] = [&evidence, &git, &outcome];

        match run_chain(&chain, cwd) {
            GuardOutcome::Block(reason) => Verdict::block(reason),
            GuardOutcome::Pass if uncommitted.is_empty() => Verdict::Allow,
            GuardOutcome::Pass => Verdict::advisory(format!(
                "Marked tested without last_commit: {}\n\
                 Record the commit hash of the tested change in the feature entry",
                uncommitted.join(", ")
            )),
        }
    }

    /// The newest feature without a feature-creation trace.
    ///
    /// Only the last entry of the list is considered; entries without an id
    /// are skipped. Unreadable stores yield `None`.
    pub fn untraced_feature(&self) -> Option<Feature> {
        let list = self
            .features
            .load_features()
            .fail_open_default("failed to read feature list")?;
        let feature = list.last().filter(|f| !f.id.is_empty())?.clone();

        let traced = TraceLedger::new(self.traces)
            .has_feature_trace(&feature.id)
            .fail_open_with("failed to read trace ledger", true);
        if traced {
            None
        } else {
            Some(feature)
        }
    }

    /// Record a pending `feature` trace for `feature`. Returns the trace id.
    pub fn trace_feature(
        &self,
        feature: &Feature,
        provider: &dyn EmbeddingProvider,
        project_dir: &Path,
    ) -> Result<String> {
        let record = self
            .state
            .load_state()
            .fail_open_default("failed to read state record");
        let mut context = TraceContext::from_state_record(
            record.as_ref(),
            Some(project_dir.display().to_string()),
        );
        context.feature_id = Some(feature.id.clone());

        let title = if feature.title.is_empty() {
            &feature.id
        } else {
            &feature.title
        };

        TraceStore::new(self.traces, provider).store(StoreRequest {
            text: feature_decision(title),
            category: FEATURE_CATEGORY.to_string(),
            outcome: Outcome::Pending,
            context,
        })
    }
}
