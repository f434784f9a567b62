//! Init command for gatekeeper.
//!
//! Creates the project's trace collection and the progress directory the
//! workflow files live in.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::EmbeddingConfig;
use crate::embedding::collection_model;
use crate::storage::TraceRepository;
use crate::traces::TraceLedger;

/// Options for the init command.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the init command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitOutput {
    /// Whether initialization was successful.
    pub success: bool,
    /// Whether a new collection was written.
    pub created: bool,
    /// Where the collection lives.
    pub location: String,
    pub dimension: usize,
    pub model: String,
    /// Traces already in an existing collection.
    pub trace_count: usize,
    /// Error message if initialization failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InitOutput {
    /// Create a failed output.
    pub fn failure(location: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            created: false,
            location: location.into(),
            dimension: 0,
            model: String::new(),
            trace_count: 0,
            error: Some(error.into()),
        }
    }
}

/// The init command implementation.
pub struct InitCommand<'a> {
    repo: &'a dyn TraceRepository,
    embedding: &'a EmbeddingConfig,
}

impl<'a> InitCommand<'a> {
    /// Create a new init command.
    pub fn new(repo: &'a dyn TraceRepository, embedding: &'a EmbeddingConfig) -> Self {
        Self { repo, embedding }
    }

    /// Run the init command.
    ///
    /// `progress_dir` is created if missing; an existing collection is kept
    /// as is.
    pub fn run(&self, progress_dir: &Path, _options: &InitOptions) -> InitOutput {
        let ledger = TraceLedger::new(self.repo);

        if let Err(e) = fs::create_dir_all(progress_dir) {
            return InitOutput::failure(
                ledger.location(),
                format!(
                    "Failed to create directory {}: {}",
                    progress_dir.display(),
                    e
                ),
            );
        }

        match ledger.init(self.embedding.dimension, collection_model(self.embedding)) {
            Ok(report) => InitOutput {
                success: true,
                created: report.created,
                location: report.location,
                dimension: report.dimension,
                model: report.model,
                trace_count: report.trace_count,
                error: None,
            },
            Err(e) => InitOutput::failure(ledger.location(), e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &InitOutput, options: &InitOptions) -> String {
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
    fn format_human_readable(&self, output: &InitOutput) -> String {
        if !output.success {
            return format!(
                "Init failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.created {
            format!(
                "Created trace collection at {}\n  model: {}\n  dimension: {}\n",
                output.location, output.model, output.dimension
            )
        } else {
            format!(
                "Trace collection already exists at {} ({} trace(s), dimension {}).\n",
                output.location, output.trace_count, output.dimension
            )
        }
    }
}
