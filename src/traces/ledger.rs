//! Lifecycle operations on the trace collection that need no embeddings.

use serde::Serialize;

use crate::error::{GateError, Result};
use crate::storage::TraceRepository;
use crate::traces::record::{DecisionTrace, Outcome, TraceCollection, FEATURE_CATEGORY};

/// Result of [`TraceLedger::init`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitReport {
    /// Whether a new collection was written.
    pub created: bool,
    pub location: String,
    /// Dimensionality of the collection now on disk.
    pub dimension: usize,
    pub model: String,
    pub trace_count: usize,
}

/// The append-only trace ledger.
pub struct TraceLedger<'a> {
    repo: &'a dyn TraceRepository,
}

impl<'a> TraceLedger<'a> {
    pub fn new(repo: &'a dyn TraceRepository) -> Self {
        Self { repo }
    }

    pub fn location(&self) -> String {
        self.repo.location()
    }

    /// Load the collection, if one exists.
    pub fn load(&self) -> Result<Option<TraceCollection>> {
        self.repo.load_collection()
    }

    /// Create the collection if absent.
    ///
    /// Idempotent: an existing collection is never rewritten, even when its
    /// dimensionality differs from `dimension`.
    pub fn init(&self, dimension: usize, model: &str) -> Result<InitReport> {
        if let Some(existing) = self.repo.load_collection()? {
            if existing.dimension != dimension {
                tracing::warn!(
                    "existing collection at {} has dimension {}, configured {}; keeping existing",
                    self.repo.location(),
                    existing.dimension,
                    dimension
                );
            }
            let trace_count = existing.len();
            return Ok(InitReport {
                created: false,
                location: self.repo.location(),
                dimension: existing.dimension,
                model: existing.model,
                trace_count,
            });
        }

        if dimension == 0 {
            return Err(GateError::invalid_input("dimension must be at least 1"));
        }

        let collection = TraceCollection::new(dimension, model);
        self.repo.save_collection(&collection)?;
        tracing::info!("created trace collection at {}", self.repo.location());

        Ok(InitReport {
            created: true,
            location: self.repo.location(),
            dimension,
            model: model.to_string(),
            trace_count: 0,
        })
    }

    /// Append a trace, creating the collection on first use.
    ///
    /// The trace's embedding must match the collection's dimensionality.
    pub fn append(&self, trace: DecisionTrace, model: &str) -> Result<()> {
        let mut collection = match self.repo.load_collection()? {
            Some(collection) => collection,
            None => TraceCollection::new(trace.embedding.len(), model),
        };

        if trace.embedding.len() != collection.dimension {
            return Err(GateError::dimension(
                collection.dimension,
                trace.embedding.len(),
            ));
        }

        collection.traces.push(trace);
        self.repo.save_collection(&collection)
    }

    /// Traces awaiting an outcome, oldest first.
    pub fn pending(&self) -> Result<Vec<DecisionTrace>> {
        Ok(self
            .repo
            .load_collection()?
            .map(|c| c.pending().cloned().collect())
            .unwrap_or_default())
    }

    /// Number of traces awaiting an outcome.
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self
            .repo
            .load_collection()?
            .map(|c| c.pending().count())
            .unwrap_or(0))
    }

    /// Resolve a pending trace.
    ///
    /// Only `pending → success` and `pending → failure` are permitted.
    pub fn update_outcome(&self, trace_id: &str, outcome: Outcome) -> Result<DecisionTrace> {
        if !outcome.is_resolved() {
            return Err(GateError::invalid_outcome(
                "outcome can only be set to success or failure",
            ));
        }

        let mut collection = self
            .repo
            .load_collection()?
            .ok_or_else(|| GateError::trace_not_found(trace_id))?;

        let trace = collection
            .get_mut(trace_id)
            .ok_or_else(|| GateError::trace_not_found(trace_id))?;

        if trace.metadata.outcome.is_resolved() {
            return Err(GateError::invalid_outcome(format!(
                "trace {} already resolved as {}",
                trace_id, trace.metadata.outcome
            )));
        }

        trace.metadata.outcome = outcome;
        let updated = trace.clone();
        self.repo.save_collection(&collection)?;
        Ok(updated)
    }

    /// Whether a feature-creation trace exists for `feature_id`.
    pub fn has_feature_trace(&self, feature_id: &str) -> Result<bool> {
        Ok(self
            .repo
            .load_collection()?
            .map(|c| {
                c.traces.iter().any(|t| {
                    t.metadata.category == FEATURE_CATEGORY
                        && t.metadata.feature_id.as_deref() == Some(feature_id)
                })
            })
            .unwrap_or(false))
    }
}
