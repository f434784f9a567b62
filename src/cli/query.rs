//! Query command for gatekeeper.
//!
//! Nearest-neighbour search over recorded decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::ProviderFactory;
use crate::storage::TraceRepository;
use crate::traces::{
    Outcome, QueryHit, QueryOptions as SearchParams, TraceLedger, TraceStore, DEFAULT_QUERY_LIMIT,
    EMPTY_COLLECTION_HINT,
};

/// Options for the query command.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of results. Defaults to 5.
    pub limit: Option<usize>,
    /// Only traces with this category.
    pub category: Option<String>,
    /// Only traces with this outcome.
    pub outcome: Option<String>,
}

/// Output format for the query command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutput {
    /// Whether the query was successful.
    pub success: bool,
    /// The query text used.
    pub query: String,
    /// Number of results found.
    pub count: usize,
    pub results: Vec<QueryResultInfo>,
    /// Set when there is nothing to search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Error message if the query failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Simplified hit info for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResultInfo {
    pub rank: usize,
    pub id: String,
    pub similarity: f32,
    pub category: String,
    pub decision: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    /// RFC 3339 in JSON output.
    pub timestamp: DateTime<Utc>,
}

impl From<QueryHit> for QueryResultInfo {
    fn from(hit: QueryHit) -> Self {
        Self {
            rank: hit.rank,
            id: hit.id,
            similarity: hit.similarity,
            category: hit.category,
            decision: hit.decision,
            outcome: hit.outcome.to_string(),
            state: hit.state,
            feature_id: hit.feature_id,
            timestamp: hit.timestamp,
        }
    }
}

impl QueryOutput {
    fn success(query: &str, results: Vec<QueryResultInfo>, hint: Option<String>) -> Self {
        Self {
            success: true,
            query: query.to_string(),
            count: results.len(),
            results,
            hint,
            error: None,
        }
    }

    fn failure(query: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            query: query.to_string(),
            count: 0,
            results: Vec::new(),
            hint: None,
            error: Some(error.into()),
        }
    }
}

/// The query command implementation.
pub struct QueryCommand<'a> {
    repo: &'a dyn TraceRepository,
    provider: ProviderFactory<'a>,
}

impl<'a> QueryCommand<'a> {
    /// Create a new query command.
    pub fn new(repo: &'a dyn TraceRepository, provider: ProviderFactory<'a>) -> Self {
        Self { repo, provider }
    }

    /// Run the query command with the given text.
    ///
    /// The provider is only built when there is something to search.
    pub fn run(&self, query: &str, options: &QueryOptions) -> QueryOutput {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return QueryOutput::failure("", "Query text cannot be empty");
        }

        let outcome = match options.outcome.as_deref() {
            None => None,
            Some(raw) => match Outcome::parse(raw) {
                Some(outcome) => Some(outcome),
                None => {
                    return QueryOutput::failure(
                        trimmed,
                        format!(
                            "Invalid outcome '{}'. Valid values: pending, success, failure",
                            raw
                        ),
                    )
                }
            },
        };

        let params = SearchParams {
            limit: options.limit.unwrap_or(DEFAULT_QUERY_LIMIT),
            category: options.category.clone(),
            outcome,
        };
        if params.limit == 0 {
            return QueryOutput::failure(trimmed, "Limit must be at least 1");
        }

        match TraceLedger::new(self.repo).load() {
            Ok(Some(collection)) if !collection.is_empty() => {}
            Ok(_) => {
                return QueryOutput::success(
                    trimmed,
                    Vec::new(),
                    Some(EMPTY_COLLECTION_HINT.to_string()),
                )
            }
            Err(e) => return QueryOutput::failure(trimmed, e.to_string()),
        }

        let provider = match (self.provider)() {
            Ok(provider) => provider,
            Err(e) => return QueryOutput::failure(trimmed, e.to_string()),
        };

        match TraceStore::new(self.repo, provider.as_ref()).query(trimmed, &params) {
            Ok(result) => QueryOutput::success(
                trimmed,
                result.hits.into_iter().map(QueryResultInfo::from).collect(),
                result.hint,
            ),
            Err(e) => QueryOutput::failure(trimmed, e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &QueryOutput, options: &QueryOptions) -> String {
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
    fn format_human_readable(&self, output: &QueryOutput) -> String {
        if !output.success {
            return format!(
                "Query failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if let Some(hint) = &output.hint {
            return format!("{}\n", hint);
        }

        if output.results.is_empty() {
            return format!("No matching traces for query: \"{}\"\n", output.query);
        }

        let mut lines = Vec::new();
        lines.push(format!(
            "Found {} similar decision(s) for: \"{}\"\n",
            output.count, output.query
        ));

        for result in &output.results {
            lines.push(format!(
                "{}. [{}] {} (similarity: {:.3})",
                result.rank, result.category, result.decision, result.similarity
            ));
            lines.push(format!(
                "   Outcome: {} | State: {} | {}",
                result.outcome,
                result.state.as_deref().unwrap_or("unknown"),
                result.timestamp.format("%Y-%m-%d %H:%M")
            ));
            if let Some(feature) = &result.feature_id {
                lines.push(format!("   Feature: {}", feature));
            }
            lines.push(format!("   ID: {}", result.id));
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingProvider, HashingProvider};
    use crate::error::{GateError, Result};
    use crate::storage::MemoryStore;
    use crate::traces::{StoreRequest, TraceContext};
    use std::cell::Cell;

    fn hashing() -> Result<Box<dyn EmbeddingProvider>> {
        Ok(Box::new(HashingProvider::new(64)))
    }

    fn seed(store: &MemoryStore, text: &str, category: &str, outcome: Outcome) {
        let provider = HashingProvider::new(64);
        TraceStore::new(store, &provider)
            .store(StoreRequest {
                text: text.to_string(),
                category: category.to_string(),
                outcome,
                context: TraceContext::default(),
            })
            .unwrap();
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        seed(&store, "Use SQLite for the session cache", "storage", Outcome::Success);
        seed(&store, "Switch the session cache to Redis", "storage", Outcome::Pending);
        seed(&store, "Adopt clap for argument parsing", "cli", Outcome::Failure);
        store
    }

    #[test]
    fn test_query_ranks_nearest_first() {
        let store = seeded();
        let cmd = QueryCommand::new(&store, &hashing);

        let output = cmd.run("session cache", &QueryOptions::default());

        assert!(output.success);
        assert_eq!(output.count, 3);
        assert_eq!(output.results[0].rank, 1);
        assert_eq!(output.results[0].category, "storage");
        assert!(output.results[0].similarity >= output.results[2].similarity);
    }

    #[test]
    fn test_query_filters_and_limit() {
        let store = seeded();
        let cmd = QueryCommand::new(&store, &hashing);

        let output = cmd.run(
            "session cache",
            &QueryOptions {
                category: Some("storage".into()),
                outcome: Some("pending".into()),
                ..Default::default()
            },
        );
        assert_eq!(output.count, 1);
        assert_eq!(output.results[0].decision, "Switch the session cache to Redis");

        let limited = cmd.run(
            "session cache",
            &QueryOptions {
                limit: Some(2),
                ..Default::default()
            },
        );
        assert_eq!(limited.count, 2);
    }

    #[test]
    fn test_query_empty_collection_skips_provider() {
        let store = MemoryStore::new();
        let calls = Cell::new(0);
        let factory = || -> Result<Box<dyn EmbeddingProvider>> {
            calls.set(calls.get() + 1);
            Err(GateError::config("VOYAGE_API_KEY not found"))
        };
        let cmd = QueryCommand::new(&store, &factory);

        let output = cmd.run("anything", &QueryOptions::default());

        assert!(output.success);
        assert_eq!(output.count, 0);
        assert_eq!(output.hint.as_deref(), Some(EMPTY_COLLECTION_HINT));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_query_rejects_zero_limit() {
        let store = seeded();
        let cmd = QueryCommand::new(&store, &hashing);

        let output = cmd.run(
            "cache",
            &QueryOptions {
                limit: Some(0),
                ..Default::default()
            },
        );
        assert!(!output.success);
    }

    #[test]
    fn test_query_rejects_invalid_outcome() {
        let store = seeded();
        let cmd = QueryCommand::new(&store, &hashing);

        let output = cmd.run(
            "cache",
            &QueryOptions {
                outcome: Some("done".into()),
                ..Default::default()
            },
        );
        assert!(!output.success);
        assert!(output.error.unwrap().contains("done"));
    }

    #[test]
    fn test_format_output_human_readable() {
        let store = seeded();
        let cmd = QueryCommand::new(&store, &hashing);
        let output = cmd.run("argument parsing", &QueryOptions::default());

        let formatted = cmd.format_output(&output, &QueryOptions::default());
        assert!(formatted.contains("Found 3 similar decision(s)"));
        assert!(formatted.contains("1. [cli] Adopt clap for argument parsing"));
    }

    #[test]
    fn test_format_output_json_full_timestamp() {
        let store = seeded();
        let cmd = QueryCommand::new(&store, &hashing);
        let output = cmd.run("argument parsing", &QueryOptions::default());
        let stored = output.results[0].timestamp;

        let formatted = cmd.format_output(
            &output,
            &QueryOptions {
                json: true,
                ..Default::default()
            },
        );
        let parsed: serde_json::Value = serde_json::from_str(&formatted).unwrap();
        let rendered = parsed["results"][0]["timestamp"].as_str().unwrap();

        assert_eq!(DateTime::parse_from_rfc3339(rendered).unwrap(), stored);
        assert!(rendered.contains('T'));
    }
}
