//! Transition command for gatekeeper.
//!
//! Moves the workflow to a new state through the same checks a direct
//! write to the state file would face, then writes the record.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{GateEvent, Gatekeeper, Verdict, WorkflowState};
use crate::error::FailOpen;
use crate::storage::StateStore;

/// Options for the transition command.
#[derive(Debug, Clone, Default)]
pub struct TransitionOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the transition command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionOutput {
    /// Whether the new state was written.
    pub success: bool,
    /// Whether a guard refused the transition.
    pub blocked: bool,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The transition command implementation.
pub struct TransitionCommand<'a> {
    gatekeeper: &'a Gatekeeper<'a>,
    state: &'a dyn StateStore,
}

impl<'a> TransitionCommand<'a> {
    pub fn new(gatekeeper: &'a Gatekeeper<'a>, state: &'a dyn StateStore) -> Self {
        Self { gatekeeper, state }
    }

    /// Run the transition command.
    ///
    /// Fields of the state record other than `state` are kept.
    pub fn run(&self, target: &str, cwd: &Path, _options: &TransitionOptions) -> TransitionOutput {
        let target = target.trim().to_uppercase();
        let mut record = self
            .state
            .load_state()
            .fail_open_default("failed to read state record")
            .unwrap_or_default();
        let from = record.current().to_string();

        let event = GateEvent::StateWrite {
            attempted: target.clone(),
        };
        if let Verdict::Block { reason } = self.gatekeeper.evaluate(&event, cwd) {
            return TransitionOutput {
                success: false,
                blocked: true,
                from,
                to: target,
                message: Some(reason.to_string()),
            };
        }

        let Some(next) = WorkflowState::parse(&target) else {
            return TransitionOutput {
                success: false,
                blocked: true,
                from,
                to: target.clone(),
                message: Some(format!("Unknown workflow state '{}'", target)),
            };
        };

        record.set(next);
        match self.state.save_state(&record) {
            Ok(()) => TransitionOutput {
                success: true,
                blocked: false,
                from,
                to: target,
                message: None,
            },
            Err(e) => TransitionOutput {
                success: false,
                blocked: false,
                from,
                to: target,
                message: Some(e.to_string()),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &TransitionOutput, options: &TransitionOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        if output.success {
            format!("{} → {}\n", output.from, output.to)
        } else if output.blocked {
            format!("{}\n", output.message.as_deref().unwrap_or("BLOCKED"))
        } else {
            format!(
                "Transition failed: {}\n",
                output.message.as_deref().unwrap_or("unknown error")
            )
        }
    }
}
