//! Embedding API credential resolution.
//!
//! Order: `VOYAGE_API_KEY`, then `voyage_api_key` in the project's
//! `.claude/config/project.json`, then `voyage_api_key` in
//! `<gatekeeper_home>/config/keys.json`.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::{gatekeeper_home, PROJECT_DIR_NAME};
use crate::error::{GateError, Result};
use crate::util::read_optional;

/// Environment variable holding the Voyage API key.
pub const API_KEY_ENV: &str = "VOYAGE_API_KEY";

/// JSON key holding the API key in config files.
pub const API_KEY_FIELD: &str = "voyage_api_key";

/// Where a key was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeySource {
    Env,
    ProjectConfig(PathBuf),
    UserConfig(PathBuf),
}

impl fmt::Display for ApiKeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env => write!(f, "${}", API_KEY_ENV),
            Self::ProjectConfig(path) | Self::UserConfig(path) => {
                write!(f, "{}", path.display())
            }
        }
    }
}

/// Project-level credential file.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root
        .join(PROJECT_DIR_NAME)
        .join("config")
        .join("project.json")
}

/// User-level credential file.
pub fn user_config_path() -> Option<PathBuf> {
    gatekeeper_home().map(|home| home.join("config").join("keys.json"))
}

/// Read `voyage_api_key` from a JSON file. Unreadable files are skipped.
fn key_from_file(path: &Path) -> Option<String> {
    let content = match read_optional(path) {
        Ok(Some(content)) => content,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("skipping credential file: {}", e);
            return None;
        }
    };
    let value: Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("skipping malformed credential file {}: {}", path.display(), e);
            return None;
        }
    };
    value
        .get(API_KEY_FIELD)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

/// Resolve the Voyage API key for a project.
pub fn resolve_api_key(project_root: &Path) -> Result<(String, ApiKeySource)> {
    if let Ok(key) = env::var(API_KEY_ENV) {
        let key = key.trim();
        if !key.is_empty() {
            return Ok((key.to_string(), ApiKeySource::Env));
        }
    }

    let project_path = project_config_path(project_root);
    if let Some(key) = key_from_file(&project_path) {
        return Ok((key, ApiKeySource::ProjectConfig(project_path)));
    }

    let user_path = user_config_path();
    if let Some(path) = &user_path {
        if let Some(key) = key_from_file(path) {
            return Ok((key, ApiKeySource::UserConfig(path.clone())));
        }
    }

    let user_hint = user_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.claude/config/keys.json".to_string());
    Err(GateError::config(format!(
        "{} not found. Set via: export {}=your_key, or add {{\"{}\": \"...\"}} to {} or {}",
        API_KEY_ENV,
        API_KEY_ENV,
        API_KEY_FIELD,
        project_path.display(),
        user_hint
    )))
}
