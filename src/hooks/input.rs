//! Hook input types.
//!
//! The agent harness passes one JSON object per intercepted tool call. Only
//! the fields gatekeeper needs are modelled; everything else is ignored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// Input for the pre- and post-tool-use hooks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HookInput {
    /// Harness session identifier.
    pub session_id: Option<String>,
    /// Working directory of the agent.
    pub cwd: Option<PathBuf>,
    /// Tool being invoked (`Write`, `Edit`, ...).
    pub tool_name: String,
    /// Tool arguments.
    pub tool_input: ToolInput,
}

/// The subset of tool arguments that carry written content.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolInput {
    /// Target file.
    pub file_path: Option<String>,
    /// Full file content (`Write`).
    pub content: Option<String>,
    /// Replacement fragment (`Edit`).
    pub new_string: Option<String>,
}

impl HookInput {
    /// The text being written: `content`, else `new_string`.
    pub fn payload(&self) -> Option<&str> {
        non_empty(&self.tool_input.content).or_else(|| non_empty(&self.tool_input.new_string))
    }

    /// Target file path, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.tool_input
            .file_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(Path::new)
    }

    /// Whether the target file is named `file_name`.
    pub fn targets_file_named(&self, file_name: &str) -> bool {
        self.file_path()
            .and_then(Path::file_name)
            .map(|n| n == file_name)
            .unwrap_or(false)
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|v| !v.trim().is_empty())
}

/// Parse hook input from JSON.
pub fn parse_input<T: for<'de> Deserialize<'de>>(json: &str) -> crate::error::Result<T> {
    serde_json::from_str(json)
        .map_err(|e| GateError::serde(format!("Failed to parse hook input: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write_input() {
        let json = r#"{
            "session_id": "abc",
            "transcript_path": "/tmp/t.jsonl",
            "cwd": "/work/app",
            "hook_event_name": "PreToolUse",
            "tool_name": "Write",
            "tool_input": {
                "file_path": "/work/app/.claude/progress/state.json",
                "content": "{\"state\": \"INIT\"}"
            }
        }"#;

        let input: HookInput = parse_input(json).unwrap();
        assert_eq!(input.session_id.as_deref(), Some("abc"));
        assert_eq!(input.cwd, Some(PathBuf::from("/work/app")));
        assert_eq!(input.tool_name, "Write");
        assert_eq!(input.payload(), Some("{\"state\": \"INIT\"}"));
        assert!(input.targets_file_named("state.json"));
        assert!(!input.targets_file_named("feature-list.json"));
    }

    #[test]
    fn test_parse_edit_input() {
        let json = r#"{
            "tool_name": "Edit",
            "tool_input": {
                "file_path": "feature-list.json",
                "old_string": "\"tested\": false",
                "new_string": "\"tested\": true"
            }
        }"#;

        let input: HookInput = parse_input(json).unwrap();
        assert_eq!(input.payload(), Some("\"tested\": true"));
        assert!(input.cwd.is_none());
    }

    #[test]
    fn test_empty_content_falls_back_to_new_string() {
        let input = HookInput {
            tool_input: ToolInput {
                content: Some("  ".into()),
                new_string: Some("x".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(input.payload(), Some("x"));
    }

    #[test]
    fn test_no_payload() {
        let input: HookInput = parse_input(r#"{"tool_name": "Bash", "tool_input": {"command": "ls"}}"#)
            .unwrap();
        assert!(input.payload().is_none());
        assert!(input.file_path().is_none());
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_input::<HookInput>("not json").unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().contains("Failed to parse hook input"));
    }
}
