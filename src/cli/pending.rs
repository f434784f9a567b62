//! Pending command for gatekeeper.
//!
//! Lists the decision traces that still await an outcome. These are what
//! block a feature from being marked tested.

use serde::{Deserialize, Serialize};

use crate::storage::TraceRepository;
use crate::traces::{DecisionTrace, TraceLedger};

/// Options for the pending command.
#[derive(Debug, Clone, Default)]
pub struct PendingOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the pending command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOutput {
    pub success: bool,
    pub count: usize,
    pub traces: Vec<PendingTraceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One pending trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTraceInfo {
    pub id: String,
    pub category: String,
    pub decision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    pub timestamp: String,
}

impl From<DecisionTrace> for PendingTraceInfo {
    fn from(trace: DecisionTrace) -> Self {
        Self {
            id: trace.id,
            category: trace.metadata.category,
            decision: trace.metadata.decision,
            feature_id: trace.metadata.feature_id,
            timestamp: trace.metadata.timestamp.to_rfc3339(),
        }
    }
}

/// The pending command implementation.
pub struct PendingCommand<'a> {
    repo: &'a dyn TraceRepository,
}

impl<'a> PendingCommand<'a> {
    pub fn new(repo: &'a dyn TraceRepository) -> Self {
        Self { repo }
    }

    pub fn run(&self, _options: &PendingOptions) -> PendingOutput {
        match TraceLedger::new(self.repo).pending() {
            Ok(traces) => PendingOutput {
                success: true,
                count: traces.len(),
                traces: traces.into_iter().map(PendingTraceInfo::from).collect(),
                error: None,
            },
            Err(e) => PendingOutput {
                success: false,
                count: 0,
                traces: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &PendingOutput, options: &PendingOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        if !output.success {
            return format!(
                "Failed to read traces: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.traces.is_empty() {
            return "No pending traces.\n".to_string();
        }

        let mut lines = vec![format!("{} pending trace(s):", output.count)];
        for trace in &output.traces {
            lines.push(format!(
                "  {} [{}] {}",
                trace.id, trace.category, trace.decision
            ));
        }
        lines.push(String::new());
        lines.push("Resolve with: gatekeeper outcome <trace_id> success|failure".to_string());

        lines.join("\n") + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingProvider;
    use crate::storage::MemoryStore;
    use crate::traces::{Outcome, StoreRequest, TraceContext, TraceStore};

    fn store(repo: &MemoryStore, text: &str, outcome: Outcome) {
        let provider = HashingProvider::new(16);
        TraceStore::new(repo, &provider)
            .store(StoreRequest {
                text: text.to_string(),
                category: "feature".into(),
                outcome,
                context: TraceContext {
                    feature_id: Some("F-1".into()),
                    ..Default::default()
                },
            })
            .unwrap();
    }

    #[test]
    fn test_lists_only_pending() {
        let repo = MemoryStore::new();
        store(&repo, "Feature created: login", Outcome::Pending);
        store(&repo, "Feature created: logout", Outcome::Success);

        let cmd = PendingCommand::new(&repo);
        let output = cmd.run(&PendingOptions::default());

        assert!(output.success);
        assert_eq!(output.count, 1);
        assert_eq!(output.traces[0].decision, "Feature created: login");
        assert_eq!(output.traces[0].feature_id.as_deref(), Some("F-1"));

        let formatted = cmd.format_output(&output, &PendingOptions::default());
        assert!(formatted.contains("1 pending trace(s)"));
        assert!(formatted.contains("gatekeeper outcome"));
    }

    #[test]
    fn test_no_collection() {
        let repo = MemoryStore::new();
        let cmd = PendingCommand::new(&repo);
        let output = cmd.run(&PendingOptions::default());

        assert!(output.success);
        assert_eq!(output.count, 0);
        assert_eq!(
            cmd.format_output(&output, &PendingOptions::default()),
            "No pending traces.\n"
        );
    }

    #[test]
    fn test_unreadable_collection() {
        let repo = MemoryStore::new().with_collection("{not json");
        let output = PendingCommand::new(&repo).run(&PendingOptions::default());
        assert!(!output.success);
        assert!(output.error.is_some());
    }
}
