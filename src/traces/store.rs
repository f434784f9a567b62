//! Storing and searching decision traces.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::StateRecord;
use crate::embedding::{EmbeddingMode, EmbeddingProvider};
use crate::error::{GateError, Result};
use crate::storage::TraceRepository;
use crate::traces::ledger::TraceLedger;
use crate::traces::record::{generate_trace_id, DecisionTrace, Outcome, TraceMetadata};

/// Shown when a query runs against a missing or empty collection.
pub const EMPTY_COLLECTION_HINT: &str =
    "No traces found. Run `gatekeeper init` and `gatekeeper store` first.";

/// State recorded when no state record exists.
pub const UNKNOWN_STATE: &str = "unknown";

/// Default number of query results.
pub const DEFAULT_QUERY_LIMIT: usize = 5;

/// Default category for stored traces.
pub const DEFAULT_CATEGORY: &str = "general";

/// Workflow context recorded with each trace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceContext {
    pub state: Option<String>,
    pub session_id: Option<String>,
    pub feature_id: Option<String>,
    pub project_dir: Option<String>,
}

impl TraceContext {
    /// Context from the project's state record.
    ///
    /// `state`, `session_id` and `feature_id` are read from the record; a
    /// missing record yields the state `unknown`.
    pub fn from_state_record(record: Option<&StateRecord>, project_dir: Option<String>) -> Self {
        let non_empty = |s: Option<&str>| s.filter(|v| !v.is_empty()).map(str::to_string);
        match record {
            Some(record) => Self {
                state: Some(
                    record
                        .state
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_STATE.to_string()),
                ),
                session_id: non_empty(record.extra_str("session_id")),
                feature_id: non_empty(record.extra_str("feature_id")),
                project_dir,
            },
            None => Self {
                state: Some(UNKNOWN_STATE.to_string()),
                project_dir,
                ..Default::default()
            },
        }
    }
}

/// A trace to store.
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub text: String,
    pub category: String,
    pub outcome: Outcome,
    pub context: TraceContext,
}

/// Search parameters.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub limit: usize,
    /// Exact-match filter on category.
    pub category: Option<String>,
    /// Exact-match filter on outcome.
    pub outcome: Option<Outcome>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_QUERY_LIMIT,
            category: None,
            outcome: None,
        }
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryHit {
    /// 1-based position in the result list.
    pub rank: usize,
    pub id: String,
    /// `1 / (1 + distance)`, in `(0, 1]`.
    pub similarity: f32,
    pub category: String,
    pub decision: String,
    pub outcome: Outcome,
    pub state: Option<String>,
    pub feature_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub hits: Vec<QueryHit>,
    /// Set when the collection is missing or empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Squared Euclidean distance.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Map a distance onto `(0, 1]`.
pub fn similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Embedding-backed trace store.
pub struct TraceStore<'a> {
    ledger: TraceLedger<'a>,
    provider: &'a dyn EmbeddingProvider,
}

impl<'a> TraceStore<'a> {
    pub fn new(repo: &'a dyn TraceRepository, provider: &'a dyn EmbeddingProvider) -> Self {
        Self {
            ledger: TraceLedger::new(repo),
            provider,
        }
    }

    /// Embed and append a trace. Returns the new trace id.
    pub fn store(&self, request: StoreRequest) -> Result<String> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(GateError::invalid_input("decision text is empty"));
        }

        let embedding = self.provider.embed(text, EmbeddingMode::Document)?;
        if embedding.len() != self.provider.dimension() {
            return Err(GateError::dimension(
                self.provider.dimension(),
                embedding.len(),
            ));
        }

        let timestamp = Utc::now();
        let id = generate_trace_id(&timestamp, text);

        let trace = DecisionTrace {
            id: id.clone(),
            embedding,
            document: text.to_string(),
            metadata: TraceMetadata {
                timestamp,
                category: request.category,
                decision: text.to_string(),
                outcome: request.outcome,
                session_id: request.context.session_id,
                feature_id: request.context.feature_id,
                state: request.context.state,
                project_dir: request.context.project_dir,
            },
        };

        self.ledger.append(trace, self.provider.model())?;
        tracing::info!(trace_id = %id, "stored decision trace");
        Ok(id)
    }

    /// Nearest-neighbour search over the collection.
    pub fn query(&self, text: &str, options: &QueryOptions) -> Result<QueryResult> {
        if options.limit == 0 {
            return Err(GateError::invalid_input("limit must be at least 1"));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(GateError::invalid_input("query text is empty"));
        }

        let collection = match self.ledger.load()? {
            Some(c) if !c.is_empty() => c,
            _ => {
                return Ok(QueryResult {
                    hits: Vec::new(),
                    hint: Some(EMPTY_COLLECTION_HINT.to_string()),
                })
            }
        };

        let query = self.provider.embed(text, EmbeddingMode::Query)?;
        if query.len() != collection.dimension {
            return Err(GateError::dimension(collection.dimension, query.len()));
        }

        let mut scored: Vec<(f32, &DecisionTrace)> = collection
            .traces
            .iter()
            .filter(|t| {
                options
                    .category
                    .as_deref()
                    .is_none_or(|c| t.metadata.category == c)
            })
            .filter(|t| options.outcome.is_none_or(|o| t.metadata.outcome == o))
            .filter(|t| {
                let ok = t.embedding.len() == collection.dimension;
                if !ok {
                    tracing::warn!("skipping trace {} with malformed embedding", t.id);
                }
                ok
            })
            .map(|t| (squared_l2(&query, &t.embedding), t))
            .collect();

        scored.sort_by(|a, b| match a.0.total_cmp(&b.0) {
            Ordering::Equal => a.1.id.cmp(&b.1.id),
            other => other,
        });

        let hits = scored
            .into_iter()
            .take(options.limit)
            .enumerate()
            .map(|(i, (distance, t))| QueryHit {
                rank: i + 1,
                id: t.id.clone(),
                similarity: similarity(distance),
                category: t.metadata.category.clone(),
                decision: t.metadata.decision.clone(),
                outcome: t.metadata.outcome,
                state: t.metadata.state.clone(),
                feature_id: t.metadata.feature_id.clone(),
                timestamp: t.metadata.timestamp,
            })
            .collect();

        Ok(QueryResult { hits, hint: None })
    }
}
