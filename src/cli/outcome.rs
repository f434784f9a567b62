//! Outcome command for gatekeeper.
//!
//! Resolves a pending decision trace as a success or a failure.

use serde::{Deserialize, Serialize};

use crate::storage::TraceRepository;
use crate::traces::{Outcome, TraceLedger};

/// Options for the outcome command.
#[derive(Debug, Clone, Default)]
pub struct OutcomeOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the outcome command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeOutput {
    /// Whether the outcome was recorded.
    pub success: bool,
    pub trace_id: String,
    pub outcome: String,
    /// The resolved decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    /// Pending traces left after the update.
    pub remaining_pending: usize,
    /// Error message if the update failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutcomeOutput {
    fn failure(trace_id: &str, outcome: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            trace_id: trace_id.to_string(),
            outcome: outcome.to_string(),
            decision: None,
            remaining_pending: 0,
            error: Some(error.into()),
        }
    }
}

/// The outcome command implementation.
pub struct OutcomeCommand<'a> {
    repo: &'a dyn TraceRepository,
}

impl<'a> OutcomeCommand<'a> {
    /// Create a new outcome command.
    pub fn new(repo: &'a dyn TraceRepository) -> Self {
        Self { repo }
    }

    /// Run the outcome command.
    pub fn run(&self, trace_id: &str, outcome: &str, _options: &OutcomeOptions) -> OutcomeOutput {
        let trace_id = trace_id.trim();
        let parsed = match Outcome::parse(outcome) {
            Some(parsed) if parsed.is_resolved() => parsed,
            _ => {
                return OutcomeOutput::failure(
                    trace_id,
                    outcome,
                    format!(
                        "Invalid outcome '{}'. Valid values: success, failure",
                        outcome
                    ),
                )
            }
        };

        let ledger = TraceLedger::new(self.repo);
        match ledger.update_outcome(trace_id, parsed) {
            Ok(trace) => OutcomeOutput {
                success: true,
                trace_id: trace.id,
                outcome: parsed.as_str().to_string(),
                decision: Some(trace.metadata.decision),
                remaining_pending: ledger.pending_count().unwrap_or(0),
                error: None,
            },
            Err(e) => OutcomeOutput::failure(trace_id, parsed.as_str(), e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &OutcomeOutput, options: &OutcomeOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else if output.success {
            format!(
                "Marked {} as {}: {}\n{} trace(s) still pending.\n",
                output.trace_id,
                output.outcome,
                output.decision.as_deref().unwrap_or(""),
                output.remaining_pending
            )
        } else {
            format!(
                "Outcome update failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}
