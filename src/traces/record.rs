//! Decision trace records and the persisted collection.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Name recorded in every collection file.
pub const COLLECTION_NAME: &str = "traces";

/// Prefix of every trace id.
pub const TRACE_ID_PREFIX: &str = "trace_";

/// Number of hex digits of the digest kept in a trace id.
pub const TRACE_ID_HEX_LEN: usize = 12;

/// Category used for traces recorded automatically on feature creation.
pub const FEATURE_CATEGORY: &str = "feature";

/// Outcome of a recorded decision.
///
/// Traces start `Pending` and move once to `Success` or `Failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Pending,
    Success,
    Failure,
}

impl Outcome {
    /// Parse an outcome name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    /// Whether the outcome is final.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata stored beside each trace's vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceMetadata {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub decision: String,
    pub outcome: Outcome,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub feature_id: Option<String>,
    /// Workflow state at the time the decision was recorded.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub project_dir: Option<String>,
}

/// One recorded decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionTrace {
    pub id: String,
    pub embedding: Vec<f32>,
    /// The embedded text.
    pub document: String,
    pub metadata: TraceMetadata,
}

/// The project's trace collection (`collection.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceCollection {
    pub name: String,
    /// Length of every embedding in the collection. Fixed at creation.
    pub dimension: usize,
    /// Embedding model the collection was created with.
    pub model: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub traces: Vec<DecisionTrace>,
}

impl TraceCollection {
    /// Create an empty collection.
    pub fn new(dimension: usize, model: impl Into<String>) -> Self {
        Self {
            name: COLLECTION_NAME.to_string(),
            dimension,
            model: model.into(),
            created_at: Utc::now(),
            traces: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Traces still awaiting an outcome.
    pub fn pending(&self) -> impl Iterator<Item = &DecisionTrace> {
        self.traces
            .iter()
            .filter(|t| t.metadata.outcome == Outcome::Pending)
    }

    /// Find a trace by id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut DecisionTrace> {
        self.traces.iter_mut().find(|t| t.id == id)
    }
}

/// Derive a trace id from its timestamp and decision text.
///
/// `trace_` followed by the first 12 hex digits of
/// `sha256(rfc3339(timestamp) ∥ decision)`.
pub fn generate_trace_id(timestamp: &DateTime<Utc>, decision: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.to_rfc3339().as_bytes());
    hasher.update(decision.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}{}", TRACE_ID_PREFIX, &digest[..TRACE_ID_HEX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_trace(id: &str, outcome: Outcome) -> DecisionTrace {
        DecisionTrace {
            id: id.to_string(),
            embedding: vec![0.0, 1.0],
            document: "decision".to_string(),
            metadata: TraceMetadata {
                timestamp: Utc::now(),
                category: "design".to_string(),
                decision: "decision".to_string(),
                outcome,
                session_id: None,
                feature_id: None,
                state: None,
                project_dir: None,
            },
        }
    }

    #[test]
    fn test_outcome_parse() {
        assert_eq!(Outcome::parse("pending"), Some(Outcome::Pending));
        assert_eq!(Outcome::parse("SUCCESS"), Some(Outcome::Success));
        assert_eq!(Outcome::parse(" failure "), Some(Outcome::Failure));
        assert_eq!(Outcome::parse("done"), None);
    }

    #[test]
    fn test_outcome_resolved() {
        assert!(!Outcome::Pending.is_resolved());
        assert!(Outcome::Success.is_resolved());
        assert!(Outcome::Failure.is_resolved());
    }

    #[test]
    fn test_trace_id_shape() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let id = generate_trace_id(&ts, "Chose retry backoff of 200ms");

        assert!(id.starts_with("trace_"));
        assert_eq!(id.len(), "trace_".len() + 12);
        assert!(id["trace_".len()..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_trace_id_deterministic() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(generate_trace_id(&ts, "a"), generate_trace_id(&ts, "a"));
        assert_ne!(generate_trace_id(&ts, "a"), generate_trace_id(&ts, "b"));

        let later = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 1).unwrap();
        assert_ne!(generate_trace_id(&ts, "a"), generate_trace_id(&later, "a"));
    }

    #[test]
    fn test_collection_pending() {
        let mut collection = TraceCollection::new(2, "voyage-3");
        collection.traces.push(sample_trace("t1", Outcome::Pending));
        collection.traces.push(sample_trace("t2", Outcome::Success));
        collection.traces.push(sample_trace("t3", Outcome::Pending));

        let pending: Vec<_> = collection.pending().map(|t| t.id.as_str()).collect();
        assert_eq!(pending, vec!["t1", "t3"]);
        assert_eq!(collection.len(), 3);
        assert!(collection.get_mut("t2").is_some());
        assert!(collection.get_mut("t9").is_none());
    }

    #[test]
    fn test_collection_json_shape() {
        let mut collection = TraceCollection::new(2, "voyage-3");
        collection.traces.push(sample_trace("t1", Outcome::Pending));

        let value = serde_json::to_value(&collection).unwrap();
        assert_eq!(value["name"], "traces");
        assert_eq!(value["dimension"], 2);
        assert_eq!(value["traces"][0]["metadata"]["outcome"], "pending");
        assert_eq!(value["traces"][0]["document"], "decision");
    }
}
