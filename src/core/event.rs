//! Decoding of intercepted write payloads.
//!
//! A payload is whatever text the agent is about to write: a whole file for
//! `Write`, a fragment for `Edit`. It is decoded once into a [`GateEvent`]
//! and nothing downstream looks at the raw text again.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::core::feature::Feature;

static STATE_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""state"\s*:\s*"([^"]*)""#).expect("valid regex"));

static STATE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""state"\s*:"#).expect("valid regex"));

static TESTED_TRUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""tested"\s*:\s*true\b"#).expect("valid regex"));

static STATUS_TESTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""status"\s*:\s*"tested""#).expect("valid regex"));

/// What an intercepted write is trying to do.
#[derive(Debug, Clone, PartialEq)]
pub enum GateEvent {
    /// Writes a workflow state.
    StateWrite { attempted: String },
    /// Writes the feature ledger.
    FeatureWrite {
        /// Whether any entry is being marked tested, by `tested: true` or
        /// `status: "tested"`.
        marks_tested: bool,
        /// Features in the payload, when it was a complete document.
        features: Vec<Feature>,
        /// Labels of entries marked tested without a `last_commit`.
        uncommitted: Vec<String>,
    },
    /// Looks like a governed write but could not be interpreted.
    Malformed { reason: String },
    /// Nothing to govern.
    Other,
}

impl GateEvent {
    /// Decode a write payload.
    ///
    /// Complete JSON objects are classified structurally. Anything else
    /// (an `Edit` fragment, a truncated document) is classified lexically.
    pub fn decode(payload: &str) -> Self {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return Self::Other;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => Self::from_object(&map),
            Ok(_) => Self::Other,
            Err(_) => Self::from_fragment(trimmed),
        }
    }

    fn from_object(map: &serde_json::Map<String, Value>) -> Self {
        if let Some(state) = map.get("state") {
            return match state.as_str() {
                Some(s) => Self::StateWrite {
                    attempted: s.to_string(),
                },
                None => Self::Malformed {
                    reason: format!("\"state\" must be a string, got {}", state),
                },
            };
        }

        let items: &[Value] = match map.get("features") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Self::Malformed {
                    reason: format!("\"features\" must be an array, got {}", other),
                }
            }
            None => &[],
        };

        if map.contains_key("features") || map.contains_key("tested") {
            // Judged on the raw entries: an entry that does not decode as a
            // `Feature` still counts when it marks itself tested.
            let tested_entries: Vec<(usize, &serde_json::Map<String, Value>)> = items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| item.as_object().map(|entry| (i, entry)))
                .filter(|(_, entry)| is_tested(entry))
                .collect();

            let mut uncommitted: Vec<String> = tested_entries
                .iter()
                .filter(|(_, entry)| !has_commit(entry))
                .map(|(i, entry)| entry_label(*i, entry))
                .collect();
            if is_tested(map) && !has_commit(map) && items.is_empty() {
                uncommitted.push(entry_label(0, map));
            }

            let features = items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect();
            return Self::FeatureWrite {
                marks_tested: is_tested(map) || !tested_entries.is_empty(),
                features,
                uncommitted,
            };
        }

        Self::Other
    }

    fn from_fragment(fragment: &str) -> Self {
        if let Some(caps) = STATE_VALUE.captures(fragment) {
            return Self::StateWrite {
                attempted: caps[1].to_string(),
            };
        }
        if STATE_KEY.is_match(fragment) {
            return Self::Malformed {
                reason: "\"state\" value is not a string literal".to_string(),
            };
        }
        if TESTED_TRUE.is_match(fragment) || STATUS_TESTED.is_match(fragment) {
            return Self::FeatureWrite {
                marks_tested: true,
                features: Vec::new(),
                uncommitted: Vec::new(),
            };
        }
        Self::Other
    }

    /// Whether this event triggers the tested-precondition chain.
    pub fn marks_tested(&self) -> bool {
        matches!(
            self,
            Self::FeatureWrite {
                marks_tested: true,
                ..
            }
        )
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StateWrite { .. } => "state_write",
            Self::FeatureWrite { .. } => "feature_write",
            Self::Malformed { .. } => "malformed",
            Self::Other => "other",
        }
    }
}

fn is_tested(entry: &serde_json::Map<String, Value>) -> bool {
    entry.get("tested") == Some(&Value::Bool(true))
        || entry.get("status").and_then(Value::as_str) == Some("tested")
}

fn has_commit(entry: &serde_json::Map<String, Value>) -> bool {
    entry
        .get("last_commit")
        .and_then(Value::as_str)
        .is_some_and(|c| !c.trim().is_empty())
}

/// The entry's id when it has a usable one, else its position.
fn entry_label(index: usize, entry: &serde_json::Map<String, Value>) -> String {
    match entry.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("#{}", index + 1),
    }
}
