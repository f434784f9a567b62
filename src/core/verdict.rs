//! Guard verdicts and block diagnostics.

use std::fmt;

use serde::Serialize;

use crate::core::workflow::WorkflowState;
use crate::error::exit_codes;

/// Why a write was vetoed.
///
/// The `Display` text is shown to the agent verbatim, so every variant
/// names the offending value and what would unblock it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockReason {
    /// The attempted state is not reachable from the current one.
    IllegalTransition {
        current: WorkflowState,
        attempted: String,
        valid_next: Vec<WorkflowState>,
    },
    /// No evidence record exists.
    MissingEvidence { path: String },
    /// The evidence record exists but is not valid JSON.
    UnreadableEvidence { path: String, detail: String },
    /// The evidence record reports failing tests.
    TestsFailed { evidence: serde_json::Value },
    /// The working tree has uncommitted or untracked paths.
    DirtyWorkingTree { paths: Vec<String>, total: usize },
    /// Decision traces still await an outcome.
    PendingTraces { count: usize },
    /// The trace ledger exists but cannot be read (strict mode only).
    UnreadableLedger { path: String, detail: String },
    /// The payload could not be interpreted (strict mode only).
    MalformedPayload { reason: String },
}

impl BlockReason {
    /// Short machine-readable label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IllegalTransition { .. } => "illegal_transition",
            Self::MissingEvidence { .. } => "missing_evidence",
            Self::UnreadableEvidence { .. } => "unreadable_evidence",
            Self::TestsFailed { .. } => "tests_failed",
            Self::DirtyWorkingTree { .. } => "dirty_working_tree",
            Self::PendingTraces { .. } => "pending_traces",
            Self::UnreadableLedger { .. } => "unreadable_ledger",
            Self::MalformedPayload { .. } => "malformed_payload",
        }
    }
}

fn state_list(states: &[WorkflowState]) -> String {
    let names: Vec<&str> = states.iter().map(|s| s.as_str()).collect();
    format!("[{}]", names.join(", "))
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalTransition {
                current,
                attempted,
                valid_next,
            } => {
                if WorkflowState::parse(attempted).is_some() {
                    writeln!(
                        f,
                        "BLOCKED: Invalid state transition {} → {}",
                        current, attempted
                    )?;
                } else {
                    writeln!(f, "BLOCKED: Unknown workflow state '{}'", attempted)?;
                }
                if valid_next.is_empty() {
                    write!(f, "{} is terminal; no transitions allowed", current)
                } else {
                    write!(
                        f,
                        "Valid transitions from {}: {}",
                        current,
                        state_list(valid_next)
                    )
                }
            }
            Self::MissingEvidence { path } => write!(
                f,
                "BLOCKED: Cannot mark tested:true without evidence\n\
                 Run the test suite first; expected results at {}",
                path
            ),
            Self::UnreadableEvidence { path, detail } => write!(
                f,
                "BLOCKED: Invalid results.json format at {}\n{}",
                path, detail
            ),
            Self::TestsFailed { evidence } => {
                let rendered = serde_json::to_string_pretty(evidence)
                    .unwrap_or_else(|_| evidence.to_string());
                write!(
                    f,
                    "BLOCKED: Cannot mark tested:true - tests did not pass\nResults: {}",
                    rendered
                )
            }
            Self::DirtyWorkingTree { paths, total } => {
                writeln!(
                    f,
                    "BLOCKED: Uncommitted changes in working tree ({} path(s))",
                    total
                )?;
                for path in paths {
                    writeln!(f, "  {}", path)?;
                }
                if *total > paths.len() {
                    writeln!(f, "  ... and {} more", total - paths.len())?;
                }
                write!(f, "Commit or stash changes before marking tested")
            }
            Self::PendingTraces { count } => write!(
                f,
                "BLOCKED: {} decision trace(s) still pending\n\
                 Update outcomes before marking feature as tested \
                 (gatekeeper pending, then gatekeeper outcome <trace_id> success|failure)",
                count
            ),
            Self::UnreadableLedger { path, detail } => write!(
                f,
                "BLOCKED: Cannot read decision trace ledger at {}\n{}",
                path, detail
            ),
            Self::MalformedPayload { reason } => {
                write!(f, "BLOCKED: Could not interpret write payload: {}", reason)
            }
        }
    }
}

/// Result of evaluating one intercepted event.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The write may proceed.
    Allow,
    /// The write proceeded but something worth reporting happened.
    Advisory { message: String },
    /// The write is vetoed.
    Block { reason: BlockReason },
}

impl Verdict {
    /// Block with the given reason.
    pub fn block(reason: BlockReason) -> Self {
        Self::Block { reason }
    }

    /// Advisory with the given message.
    pub fn advisory(message: impl Into<String>) -> Self {
        Self::Advisory {
            message: message.into(),
        }
    }

    /// Process exit code for this verdict.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Allow => exit_codes::ALLOW,
            Self::Advisory { .. } => exit_codes::ADVISORY,
            Self::Block { .. } => exit_codes::BLOCK,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Block { .. })
    }

    /// Short label: `allow`, `advisory`, or `block`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Advisory { .. } => "advisory",
            Self::Block { .. } => "block",
        }
    }

    /// Diagnostic text for the error channel, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::Advisory { message } => Some(message.clone()),
            Self::Block { reason } => Some(reason.to_string()),
        }
    }
}
