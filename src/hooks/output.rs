//! Hook output.
//!
//! The harness acts on the exit code: 0 lets the write through, 2 blocks it
//! and feeds stderr back to the agent, anything else is a non-blocking
//! warning shown from stderr. A block additionally prints the harness's
//! `{"decision": "block", "reason": ...}` object on stdout. Allow and
//! advisory verdicts print nothing on stdout, so they never override the
//! harness's own permission handling.

use serde::Serialize;

use crate::core::Verdict;
use crate::error::GateError;

/// Hook JSON in the harness's schema. Only emitted for blocks.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HookOutput {
    /// Always `block`.
    pub decision: &'static str,
    /// Shown to the agent.
    pub reason: String,
}

impl HookOutput {
    /// Stdout JSON for a verdict, if it needs any.
    pub fn for_verdict(verdict: &Verdict) -> Option<Self> {
        match verdict {
            Verdict::Block { reason } => Some(Self {
                decision: "block",
                reason: reason.to_string(),
            }),
            Verdict::Allow | Verdict::Advisory { .. } => None,
        }
    }
}

/// Serialize output to JSON.
pub fn to_json<T: Serialize>(output: &T) -> crate::error::Result<String> {
    serde_json::to_string(output)
        .map_err(|e| GateError::serde(format!("Failed to serialize output: {}", e)))
}
