//! Workflow lifecycle states and the transition table.
//!
//! A project is always in exactly one [`WorkflowState`]. The state is stored
//! in a small JSON record (`.claude/progress/state.json`) whose `state` field
//! is the only value gatekeeper governs; any other fields the harness keeps
//! there are carried through untouched.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Workflow lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    /// Nothing has happened yet.
    #[default]
    Start,
    /// Project scaffolding.
    Init,
    /// Writing code.
    Implement,
    /// Running and fixing tests.
    Test,
    /// Terminal state.
    Complete,
    /// Recovery entry point for a broken project.
    FixBroken,
}

impl WorkflowState {
    /// Every state, in lifecycle order.
    pub const ALL: [WorkflowState; 6] = [
        WorkflowState::Start,
        WorkflowState::Init,
        WorkflowState::Implement,
        WorkflowState::Test,
        WorkflowState::Complete,
        WorkflowState::FixBroken,
    ];

    /// Parse a state name. Matching is exact (`"TEST"`, not `"test"`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "START" => Some(Self::Start),
            "INIT" => Some(Self::Init),
            "IMPLEMENT" => Some(Self::Implement),
            "TEST" => Some(Self::Test),
            "COMPLETE" => Some(Self::Complete),
            "FIX_BROKEN" => Some(Self::FixBroken),
            _ => None,
        }
    }

    /// Wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Init => "INIT",
            Self::Implement => "IMPLEMENT",
            Self::Test => "TEST",
            Self::Complete => "COMPLETE",
            Self::FixBroken => "FIX_BROKEN",
        }
    }

    /// Legal next states, excluding the implicit self-transition.
    pub fn valid_next(&self) -> &'static [WorkflowState] {
        match self {
            Self::Start => &[Self::Init, Self::Implement],
            Self::FixBroken => &[Self::Init],
            Self::Init => &[Self::Implement],
            Self::Implement => &[Self::Test],
            Self::Test => &[Self::Implement, Self::Complete],
            Self::Complete => &[],
        }
    }

    /// Whether moving from `self` to `next` is legal.
    ///
    /// Re-writing the current state is always legal.
    pub fn can_transition_to(&self, next: WorkflowState) -> bool {
        *self == next || self.valid_next().contains(&next)
    }

    /// Whether no transition leaves this state.
    pub fn is_terminal(&self) -> bool {
        self.valid_next().is_empty()
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contents of the workflow state record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StateRecord {
    /// Current state, as written. May be an unrecognized name.
    #[serde(default)]
    pub state: Option<String>,
    /// Harness-owned fields carried through unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StateRecord {
    /// Record holding a single state.
    pub fn new(state: WorkflowState) -> Self {
        Self {
            state: Some(state.as_str().to_string()),
            extra: serde_json::Map::new(),
        }
    }

    /// The effective current state.
    ///
    /// An absent or unrecognized state reads as [`WorkflowState::Start`].
    pub fn current(&self) -> WorkflowState {
        self.state
            .as_deref()
            .and_then(WorkflowState::parse)
            .unwrap_or_default()
    }

    /// Replace the state, keeping every other field.
    pub fn set(&mut self, state: WorkflowState) {
        self.state = Some(state.as_str().to_string());
    }

    /// A string field kept alongside the state (`session_id`, `feature_id`).
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_names() {
        for state in WorkflowState::ALL {
            assert_eq!(WorkflowState::parse(state.as_str()), Some(state));
        }
        assert_eq!(WorkflowState::parse("test"), None);
        assert_eq!(WorkflowState::parse("DONE"), None);
        assert_eq!(WorkflowState::parse(""), None);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&WorkflowState::FixBroken).unwrap();
        assert_eq!(json, "\"FIX_BROKEN\"");

        let parsed: WorkflowState = serde_json::from_str("\"IMPLEMENT\"").unwrap();
        assert_eq!(parsed, WorkflowState::Implement);
    }

    #[test]
    fn test_transition_table() {
        use WorkflowState::*;

        assert_eq!(Start.valid_next(), &[Init, Implement]);
        assert_eq!(FixBroken.valid_next(), &[Init]);
        assert_eq!(Init.valid_next(), &[Implement]);
        assert_eq!(Implement.valid_next(), &[Test]);
        assert_eq!(Test.valid_next(), &[Implement, Complete]);
        assert!(Complete.valid_next().is_empty());
    }

    #[test]
    fn test_self_transition_always_legal() {
        for state in WorkflowState::ALL {
            assert!(state.can_transition_to(state));
        }
    }

    #[test]
    fn test_can_transition_to() {
        use WorkflowState::*;

        assert!(Start.can_transition_to(Init));
        assert!(Test.can_transition_to(Complete));
        assert!(!Start.can_transition_to(Test));
        assert!(!Complete.can_transition_to(Start));
        assert!(!Implement.can_transition_to(Complete));
    }

    #[test]
    fn test_only_complete_is_terminal() {
        let terminal: Vec<_> = WorkflowState::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![WorkflowState::Complete]);
    }

    // State record

    #[test]
    fn test_record_defaults_to_start() {
        assert_eq!(StateRecord::default().current(), WorkflowState::Start);
    }

    #[test]
    fn test_record_unknown_state_reads_as_start() {
        let record: StateRecord = serde_json::from_str(r#"{"state": "DANCING"}"#).unwrap();
        assert_eq!(record.current(), WorkflowState::Start);
    }

    #[test]
    fn test_record_preserves_extra_fields() {
        let mut record: StateRecord = serde_json::from_str(
            r#"{"state": "INIT", "session_id": "abc", "feature_id": "F-1"}"#,
        )
        .unwrap();
        assert_eq!(record.current(), WorkflowState::Init);
        assert_eq!(record.extra_str("session_id"), Some("abc"));

        record.set(WorkflowState::Implement);
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["state"], "IMPLEMENT");
        assert_eq!(json["feature_id"], "F-1");
    }
}
