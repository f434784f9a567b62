//! Configuration loading for gatekeeper.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.claude/gatekeeper.toml`)
//! 3. User config (`~/.claude/gatekeeper.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The embedding credential is resolved
//! separately (see [`crate::embedding::credentials`]) because it lives in the
//! harness's own JSON config files.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GateError, Result};

/// Main configuration struct for gatekeeper.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Guard policy.
    pub guards: GuardConfig,
    /// Project-relative locations of the governed files.
    pub paths: PathsConfig,
    /// Embedding provider settings.
    pub embedding: EmbeddingConfig,
}

/// Guard policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardConfig {
    /// Block instead of allowing when an event or record cannot be parsed.
    pub strict: bool,
    /// Absolute path of the test evidence record.
    pub evidence_path: PathBuf,
    /// How many dirty paths to list in a git hygiene block.
    pub max_dirty_paths: usize,
}

/// Default location of the test evidence record.
pub const DEFAULT_EVIDENCE_PATH: &str = "/tmp/test-evidence/results.json";

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            strict: false,
            evidence_path: PathBuf::from(DEFAULT_EVIDENCE_PATH),
            max_dirty_paths: 5,
        }
    }
}

/// Project-relative file locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Workflow state record.
    pub state_file: PathBuf,
    /// Feature list.
    pub feature_file: PathBuf,
    /// Directory holding the trace collection.
    pub trace_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(".claude/progress/state.json"),
            feature_file: PathBuf::from(".claude/progress/feature-list.json"),
            trace_dir: PathBuf::from(".claude/traces"),
        }
    }
}

/// Which embedding provider to use.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Voyage AI HTTP API.
    #[default]
    Voyage,
    /// Offline feature-hashing embeddings.
    Hashing,
}

impl ProviderKind {
    /// Parse a provider name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "voyage" => Some(Self::Voyage),
            "hashing" | "local" => Some(Self::Hashing),
            _ => None,
        }
    }
}

/// Valid values for the provider field.
pub const VALID_PROVIDERS: &[&str] = &["voyage", "hashing"];

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider implementation.
    pub provider: ProviderKind,
    /// Model name sent to the provider.
    pub model: String,
    /// Vector dimensionality recorded in new collections.
    pub dimension: usize,
    /// Base URL of the provider API.
    pub base_url: String,
    /// HTTP client timeout.
    pub timeout_seconds: u64,
}

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "voyage-3";

/// Dimensionality of `voyage-3` embeddings.
pub const DEFAULT_DIMENSION: usize = 1024;

/// Default Voyage API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.voyageai.com/v1";

impl EmbeddingConfig {
    /// Check if a dimension value is usable (must be >= 1).
    pub fn is_valid_dimension(value: usize) -> bool {
        value >= 1
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Voyage,
            model: DEFAULT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain for a project root.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `<gatekeeper_home>/gatekeeper.toml`.
    fn load_user_config() -> Option<Config> {
        let home = gatekeeper_home()?;
        Self::load_from_file(&home.join(CONFIG_FILE_NAME)).ok()
    }

    /// Load project config from `.claude/gatekeeper.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let path = cwd.join(PROJECT_DIR_NAME).join(CONFIG_FILE_NAME);
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("ignoring project config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load config from a specific file path.
    fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| GateError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| GateError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // GATEKEEPER_STRICT
        if let Ok(val) = env::var("GATEKEEPER_STRICT") {
            self.guards.strict = val == "true" || val == "1";
        }

        // GATEKEEPER_EVIDENCE_PATH
        if let Ok(val) = env::var("GATEKEEPER_EVIDENCE_PATH") {
            if val.trim().is_empty() {
                eprintln!(
                    "Warning: GATEKEEPER_EVIDENCE_PATH is empty. Using default '{}'.",
                    self.guards.evidence_path.display()
                );
            } else {
                self.guards.evidence_path = PathBuf::from(val);
            }
        }

        // GATEKEEPER_EMBEDDING_PROVIDER
        if let Ok(val) = env::var("GATEKEEPER_EMBEDDING_PROVIDER") {
            match ProviderKind::parse(&val) {
                Some(kind) => self.embedding.provider = kind,
                None => eprintln!(
                    "Warning: Invalid GATEKEEPER_EMBEDDING_PROVIDER value '{}'. \
                    Valid values: {:?}. Using default '{:?}'.",
                    val, VALID_PROVIDERS, self.embedding.provider
                ),
            }
        }

        // GATEKEEPER_EMBEDDING_MODEL
        if let Ok(val) = env::var("GATEKEEPER_EMBEDDING_MODEL") {
            if !val.trim().is_empty() {
                self.embedding.model = val;
            }
        }

        // GATEKEEPER_EMBEDDING_DIMENSION
        if let Ok(val) = env::var("GATEKEEPER_EMBEDDING_DIMENSION") {
            match val.parse::<usize>() {
                Ok(n) if EmbeddingConfig::is_valid_dimension(n) => self.embedding.dimension = n,
                _ => eprintln!(
                    "Warning: Invalid GATEKEEPER_EMBEDDING_DIMENSION value '{}'. \
                    Expected a positive integer. Using default '{}'.",
                    val, self.embedding.dimension
                ),
            }
        }

        // GATEKEEPER_EMBEDDING_URL
        if let Ok(val) = env::var("GATEKEEPER_EMBEDDING_URL") {
            if !val.trim().is_empty() {
                self.embedding.base_url = val.trim_end_matches('/').to_string();
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// Field-by-field: every non-default value in `other` wins. A layer
    /// cannot set a value back to its default to undo a lower layer.
    fn merge(mut self, other: Config) -> Self {
        let default_guards = GuardConfig::default();
        if other.guards.strict != default_guards.strict {
            self.guards.strict = other.guards.strict;
        }
        if other.guards.evidence_path != default_guards.evidence_path {
            self.guards.evidence_path = other.guards.evidence_path;
        }
        if other.guards.max_dirty_paths != default_guards.max_dirty_paths {
            self.guards.max_dirty_paths = other.guards.max_dirty_paths;
        }

        let default_paths = PathsConfig::default();
        if other.paths.state_file != default_paths.state_file {
            self.paths.state_file = other.paths.state_file;
        }
        if other.paths.feature_file != default_paths.feature_file {
            self.paths.feature_file = other.paths.feature_file;
        }
        if other.paths.trace_dir != default_paths.trace_dir {
            self.paths.trace_dir = other.paths.trace_dir;
        }

        let default_embedding = EmbeddingConfig::default();
        if other.embedding.provider != default_embedding.provider {
            self.embedding.provider = other.embedding.provider;
        }
        if other.embedding.model != default_embedding.model {
            self.embedding.model = other.embedding.model;
        }
        if other.embedding.dimension != default_embedding.dimension {
            self.embedding.dimension = other.embedding.dimension;
        }
        if other.embedding.base_url != default_embedding.base_url {
            self.embedding.base_url = other.embedding.base_url;
        }
        if other.embedding.timeout_seconds != default_embedding.timeout_seconds {
            self.embedding.timeout_seconds = other.embedding.timeout_seconds;
        }

        self
    }

    /// Absolute path of the state record for a project.
    pub fn state_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.paths.state_file)
    }

    /// Absolute path of the feature list for a project.
    pub fn feature_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.paths.feature_file)
    }

    /// Absolute path of the trace collection directory for a project.
    pub fn trace_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.paths.trace_dir)
    }
}

/// Name of the per-project harness directory.
pub const PROJECT_DIR_NAME: &str = ".claude";

/// File name of the gatekeeper TOML config, both project and user level.
pub const CONFIG_FILE_NAME: &str = "gatekeeper.toml";

/// Get the gatekeeper home directory.
///
/// Checks `GATEKEEPER_HOME` first, then falls back to `~/.claude`.
/// An empty `GATEKEEPER_HOME` is ignored.
pub fn gatekeeper_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("GATEKEEPER_HOME") {
        if home.is_empty() {
            tracing::warn!("GATEKEEPER_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("GATEKEEPER_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    dirs::home_dir().map(|home| home.join(PROJECT_DIR_NAME))
}

/// Find the project root for a given working directory.
///
/// Precedence:
/// 1. nearest ancestor with a `.claude/` directory (the user's home is skipped,
///    its `.claude/` belongs to the harness, not to a project),
/// 2. the git repository root (`git rev-parse --show-toplevel`),
/// 3. the working directory itself.
pub fn find_project_root(cwd: &Path) -> PathBuf {
    let home = dirs::home_dir();
    for ancestor in cwd.ancestors() {
        if home.as_deref() == Some(ancestor) {
            break;
        }
        if ancestor.join(PROJECT_DIR_NAME).is_dir() {
            return ancestor.to_path_buf();
        }
    }

    if let Ok(output) = std::process::Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(cwd)
        .output()
    {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
        }
    }

    cwd.to_path_buf()
}

/// Resolve the project root from an explicit override or the working directory.
pub fn resolve_project_root(project_dir: Option<&Path>, cwd: &Path) -> PathBuf {
    match project_dir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => cwd.join(dir),
        None => find_project_root(cwd),
    }
}
