//! Store command for gatekeeper.
//!
//! Embeds a decision and appends it to the trace collection, tagged with
//! the project's current workflow context.

use serde::{Deserialize, Serialize};

use crate::cli::ProviderFactory;
use crate::error::FailOpen;
use crate::storage::{StateStore, TraceRepository};
use crate::traces::{Outcome, StoreRequest, TraceContext, TraceStore, DEFAULT_CATEGORY};

/// Options for the store command.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Category tag. Defaults to `general`.
    pub category: Option<String>,
    /// Initial outcome. Defaults to `pending`.
    pub outcome: Option<String>,
    /// Session id; defaults to the state record's.
    pub session_id: Option<String>,
    /// Feature id; defaults to the state record's.
    pub feature_id: Option<String>,
    /// Project directory recorded with the trace.
    pub project_dir: Option<String>,
}

/// Output format for the store command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreOutput {
    /// Whether the trace was stored.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    pub category: String,
    pub outcome: String,
    /// Workflow state recorded with the trace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Error message if storing failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StoreOutput {
    fn failure(category: &str, outcome: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            trace_id: None,
            category: category.to_string(),
            outcome: outcome.to_string(),
            state: None,
            error: Some(error.into()),
        }
    }
}

/// The store command implementation.
pub struct StoreCommand<'a> {
    repo: &'a dyn TraceRepository,
    state: &'a dyn StateStore,
    provider: ProviderFactory<'a>,
}

impl<'a> StoreCommand<'a> {
    /// Create a new store command.
    pub fn new(
        repo: &'a dyn TraceRepository,
        state: &'a dyn StateStore,
        provider: ProviderFactory<'a>,
    ) -> Self {
        Self {
            repo,
            state,
            provider,
        }
    }

    /// Run the store command with the given decision text.
    pub fn run(&self, decision: &str, options: &StoreOptions) -> StoreOutput {
        let category = options
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);

        let outcome = match options.outcome.as_deref() {
            None => Outcome::Pending,
            Some(raw) => match Outcome::parse(raw) {
                Some(outcome) => outcome,
                None => {
                    return StoreOutput::failure(
                        category,
                        raw,
                        format!(
                            "Invalid outcome '{}'. Valid values: pending, success, failure",
                            raw
                        ),
                    )
                }
            },
        };

        if decision.trim().is_empty() {
            return StoreOutput::failure(
                category,
                outcome.as_str(),
                "Decision text cannot be empty",
            );
        }

        let record = self
            .state
            .load_state()
            .fail_open_default("failed to read state record");
        let mut context =
            TraceContext::from_state_record(record.as_ref(), options.project_dir.clone());
        if options.session_id.is_some() {
            context.session_id = options.session_id.clone();
        }
        if options.feature_id.is_some() {
            context.feature_id = options.feature_id.clone();
        }
        let state = context.state.clone();

        let provider = match (self.provider)() {
            Ok(provider) => provider,
            Err(e) => return StoreOutput::failure(category, outcome.as_str(), e.to_string()),
        };

        let stored = TraceStore::new(self.repo, provider.as_ref()).store(StoreRequest {
            text: decision.to_string(),
            category: category.to_string(),
            outcome,
            context,
        });

        match stored {
            Ok(trace_id) => StoreOutput {
                success: true,
                trace_id: Some(trace_id),
                category: category.to_string(),
                outcome: outcome.as_str().to_string(),
                state,
                error: None,
            },
            Err(e) => StoreOutput::failure(category, outcome.as_str(), e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StoreOutput, options: &StoreOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &StoreOutput) -> String {
        if !output.success {
            return format!(
                "Store failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = vec![format!(
            "Stored trace {}",
            output.trace_id.as_deref().unwrap_or("?")
        )];
        lines.push(format!("  category: {}", output.category));
        lines.push(format!("  outcome: {}", output.outcome));
        if let Some(state) = &output.state {
            lines.push(format!("  state: {}", state));
        }

        lines.join("\n") + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingProvider, HashingProvider};
    use crate::error::{GateError, Result};
    use crate::storage::MemoryStore;
    use crate::traces::TraceLedger;

    fn hashing() -> Result<Box<dyn EmbeddingProvider>> {
        Ok(Box::new(HashingProvider::new(32)))
    }

    fn no_key() -> Result<Box<dyn EmbeddingProvider>> {
        Err(GateError::config("VOYAGE_API_KEY not found"))
    }

    #[test]
    fn test_store_records_state_context() {
        let store = MemoryStore::new().with_state(r#"{"state": "IMPLEMENT", "session_id": "s-9"}"#);
        let cmd = StoreCommand::new(&store, &store, &hashing);

        let output = cmd.run(
            "Use SQLite for the session cache",
            &StoreOptions {
                category: Some("architecture".into()),
                ..Default::default()
            },
        );

        assert!(output.success, "{:?}", output.error);
        assert!(output.trace_id.as_deref().unwrap().starts_with("trace_"));
        assert_eq!(output.category, "architecture");
        assert_eq!(output.outcome, "pending");
        assert_eq!(output.state.as_deref(), Some("IMPLEMENT"));

        let collection = TraceLedger::new(&store).load().unwrap().unwrap();
        assert_eq!(collection.traces[0].metadata.session_id.as_deref(), Some("s-9"));
    }

    #[test]
    fn test_store_explicit_ids_override_state_record() {
        let store = MemoryStore::new()
            .with_state(r#"{"state": "TEST", "session_id": "s-1", "feature_id": "F-1"}"#);
        let cmd = StoreCommand::new(&store, &store, &hashing);

        let output = cmd.run(
            "Split the parser module",
            &StoreOptions {
                feature_id: Some("F-2".into()),
                ..Default::default()
            },
        );
        assert!(output.success);

        let collection = TraceLedger::new(&store).load().unwrap().unwrap();
        let metadata = &collection.traces[0].metadata;
        assert_eq!(metadata.feature_id.as_deref(), Some("F-2"));
        assert_eq!(metadata.session_id.as_deref(), Some("s-1"));
    }

    #[test]
    fn test_store_defaults() {
        let store = MemoryStore::new();
        let cmd = StoreCommand::new(&store, &store, &hashing);

        let output = cmd.run("Pick a name", &StoreOptions::default());
        assert!(output.success);
        assert_eq!(output.category, "general");
        assert_eq!(output.state.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_store_with_resolved_outcome() {
        let store = MemoryStore::new();
        let cmd = StoreCommand::new(&store, &store, &hashing);

        let output = cmd.run(
            "Retry flaky tests once",
            &StoreOptions {
                outcome: Some("Success".into()),
                ..Default::default()
            },
        );
        assert!(output.success);
        assert_eq!(output.outcome, "success");
        assert_eq!(TraceLedger::new(&store).pending_count().unwrap(), 0);
    }

    #[test]
    fn test_store_rejects_invalid_outcome() {
        let store = MemoryStore::new();
        let cmd = StoreCommand::new(&store, &store, &hashing);

        let output = cmd.run(
            "x",
            &StoreOptions {
                outcome: Some("maybe".into()),
                ..Default::default()
            },
        );
        assert!(!output.success);
        assert!(output.error.unwrap().contains("maybe"));
    }

    #[test]
    fn test_store_rejects_empty_text() {
        let store = MemoryStore::new();
        let cmd = StoreCommand::new(&store, &store, &hashing);

        let output = cmd.run("   ", &StoreOptions::default());
        assert!(!output.success);
        assert!(TraceLedger::new(&store).load().unwrap().is_none());
    }

    #[test]
    fn test_store_missing_credentials() {
        let store = MemoryStore::new();
        let cmd = StoreCommand::new(&store, &store, &no_key);

        let output = cmd.run("Use Postgres", &StoreOptions::default());
        assert!(!output.success);
        assert!(output.error.unwrap().contains("VOYAGE_API_KEY"));
        assert!(TraceLedger::new(&store).load().unwrap().is_none());
    }

    #[test]
    fn test_format_human_readable() {
        let store = MemoryStore::new();
        let cmd = StoreCommand::new(&store, &store, &hashing);
        let output = cmd.run("Cache embeddings", &StoreOptions::default());

        let formatted = cmd.format_output(&output, &StoreOptions::default());
        assert!(formatted.starts_with("Stored trace trace_"));
        assert!(formatted.contains("category: general"));
    }
}
