//! Status command for gatekeeper.
//!
//! Shows where the project stands: current workflow state, the legal next
//! states, feature progress and unresolved traces.

use serde::{Deserialize, Serialize};

use crate::core::WorkflowState;
use crate::error::FailOpen;
use crate::storage::{FeatureStore, StateStore, TraceRepository};
use crate::traces::TraceLedger;

/// Options for the status command.
#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the status command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusOutput {
    /// Effective current state.
    pub state: String,
    /// State name as written, when it is not a known state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrecognized_state: Option<String>,
    pub valid_next: Vec<String>,
    pub terminal: bool,
    pub features_total: usize,
    pub features_tested: usize,
    /// `None` when the trace collection cannot be read.
    pub pending_traces: Option<usize>,
}

/// The status command implementation.
pub struct StatusCommand<'a> {
    state: &'a dyn StateStore,
    features: &'a dyn FeatureStore,
    traces: &'a dyn TraceRepository,
}

impl<'a> StatusCommand<'a> {
    pub fn new(
        state: &'a dyn StateStore,
        features: &'a dyn FeatureStore,
        traces: &'a dyn TraceRepository,
    ) -> Self {
        Self {
            state,
            features,
            traces,
        }
    }

    /// Run the status command. Unreadable files read as empty.
    pub fn run(&self, _options: &StatusOptions) -> StatusOutput {
        let record = self
            .state
            .load_state()
            .fail_open_default("failed to read state record");
        let current = record
            .as_ref()
            .map(|r| r.current())
            .unwrap_or_default();
        let unrecognized_state = record
            .and_then(|r| r.state)
            .filter(|s| WorkflowState::parse(s).is_none());

        let features = self
            .features
            .load_features()
            .fail_open_default("failed to read feature list")
            .unwrap_or_default();

        let pending_traces = match TraceLedger::new(self.traces).pending_count() {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!("failed to read trace ledger: {}", e);
                None
            }
        };

        StatusOutput {
            state: current.to_string(),
            unrecognized_state,
            valid_next: current
                .valid_next()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            terminal: current.is_terminal(),
            features_total: features.features.len(),
            features_tested: features.tested_count(),
            pending_traces,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatusOutput, options: &StatusOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        let mut lines = Vec::new();
        match &output.unrecognized_state {
            Some(raw) => lines.push(format!(
                "State: {} (record holds unknown state '{}')",
                output.state, raw
            )),
            None => lines.push(format!("State: {}", output.state)),
        }
        if output.terminal {
            lines.push("Next: none (terminal)".to_string());
        } else {
            lines.push(format!("Next: {}", output.valid_next.join(", ")));
        }
        lines.push(format!(
            "Features: {}/{} tested",
            output.features_tested, output.features_total
        ));
        match output.pending_traces {
            Some(count) => lines.push(format!("Pending traces: {}", count)),
            None => lines.push("Pending traces: unreadable".to_string()),
        }

        lines.join("\n") + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_status_of_empty_project() {
        let store = MemoryStore::new();
        let output = StatusCommand::new(&store, &store, &store).run(&StatusOptions::default());

        assert_eq!(output.state, "START");
        assert_eq!(output.valid_next, vec!["INIT", "IMPLEMENT"]);
        assert!(!output.terminal);
        assert_eq!(output.features_total, 0);
        assert_eq!(output.pending_traces, Some(0));
    }

    #[test]
    fn test_status_reports_progress() {
        let store = MemoryStore::new()
            .with_state(r#"{"state": "TEST"}"#)
            .with_features(
                r#"{"features": [
                    {"id": "F-1", "tested": true},
                    {"id": "F-2", "tested": false}
                ]}"#,
            );
        let cmd = StatusCommand::new(&store, &store, &store);
        let output = cmd.run(&StatusOptions::default());

        assert_eq!(output.state, "TEST");
        assert!(output.valid_next.contains(&"COMPLETE".to_string()));
        assert_eq!(output.features_total, 2);
        assert_eq!(output.features_tested, 1);

        let formatted = cmd.format_output(&output, &StatusOptions::default());
        assert!(formatted.contains("State: TEST"));
        assert!(formatted.contains("Features: 1/2 tested"));
    }

    #[test]
    fn test_status_unknown_state() {
        let store = MemoryStore::new().with_state(r#"{"state": "DEPLOYING"}"#);
        let output = StatusCommand::new(&store, &store, &store).run(&StatusOptions::default());

        assert_eq!(output.state, "START");
        assert_eq!(output.unrecognized_state.as_deref(), Some("DEPLOYING"));
    }

    #[test]
    fn test_status_unreadable_ledger() {
        let store = MemoryStore::new().with_collection("{");
        let output = StatusCommand::new(&store, &store, &store).run(&StatusOptions::default());
        assert_eq!(output.pending_traces, None);
    }
}
