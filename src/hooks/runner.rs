//! Hook runner for gatekeeper.
//!
//! One process per intercepted write. The runner resolves the project,
//! loads its configuration, wires the file-backed stores into a
//! [`Gatekeeper`] and turns the result into a [`Verdict`].

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::config::{resolve_project_root, Config};
use crate::core::{BlockReason, GateEvent, Gatekeeper, GuardPolicy, Verdict};
use crate::embedding::create_provider;
use crate::error::{GateError, Result};
use crate::hooks::input::{parse_input, HookInput};
use crate::storage::{FileEvidenceStore, FileFeatureStore, FileStateStore, FileTraceRepository};
use crate::vcs::VcsStatus;

/// Hook type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookType {
    /// Before the write lands. May block.
    PreToolUse,
    /// After the write landed. Never blocks.
    PostToolUse,
}

impl HookType {
    /// Parse hook type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pre-tool-use" | "pretooluse" | "pre_tool_use" => Some(Self::PreToolUse),
            "post-tool-use" | "posttooluse" | "post_tool_use" => Some(Self::PostToolUse),
            _ => None,
        }
    }
}

/// File-backed stores for one project.
struct ProjectStores {
    state: FileStateStore,
    features: FileFeatureStore,
    evidence: FileEvidenceStore,
    traces: FileTraceRepository,
}

impl ProjectStores {
    fn open(config: &Config, root: &Path) -> Self {
        Self {
            state: FileStateStore::new(config.state_path(root)),
            features: FileFeatureStore::new(config.feature_path(root)),
            evidence: FileEvidenceStore::new(&config.guards.evidence_path),
            traces: FileTraceRepository::new(config.trace_dir(root)),
        }
    }
}

/// Hook runner context.
pub struct HookRunner<V: VcsStatus> {
    vcs: V,
    /// Explicit project root; otherwise discovered from the hook's cwd.
    project_dir: Option<PathBuf>,
    /// Fixed configuration; otherwise loaded for the resolved project.
    config: Option<Config>,
}

impl<V: VcsStatus> HookRunner<V> {
    /// Create a new hook runner.
    pub fn new(vcs: V) -> Self {
        Self {
            vcs,
            project_dir: None,
            config: None,
        }
    }

    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Run a hook with input from stdin.
    pub fn run(&self, hook_type: HookType) -> Result<Verdict> {
        let input = read_stdin()?;
        self.run_with_input(hook_type, &input)
    }

    /// Run a hook with provided input.
    pub fn run_with_input(&self, hook_type: HookType, input: &str) -> Result<Verdict> {
        let process_cwd = std::env::current_dir().map_err(|e| GateError::storage(".", e))?;

        let hook_input: HookInput = match parse_input(input) {
            Ok(parsed) => parsed,
            Err(e) => {
                let root = resolve_project_root(self.project_dir.as_deref(), &process_cwd);
                let strict = self.config_for(&root).guards.strict;
                if strict && hook_type == HookType::PreToolUse {
                    return Ok(Verdict::block(BlockReason::MalformedPayload {
                        reason: e.to_string(),
                    }));
                }
                tracing::warn!("{} (fail-open)", e);
                return Ok(Verdict::Allow);
            }
        };

        let cwd = hook_input.cwd.clone().unwrap_or(process_cwd);
        let root = resolve_project_root(self.project_dir.as_deref(), &cwd);
        let config = self.config_for(&root);
        tracing::debug!(root = %root.display(), tool = %hook_input.tool_name, "running hook");

        Ok(match hook_type {
            HookType::PreToolUse => self.handle_pre_tool_use(&hook_input, &config, &root, &cwd),
            HookType::PostToolUse => self.handle_post_tool_use(&hook_input, &config, &root),
        })
    }

    fn config_for(&self, root: &Path) -> Config {
        self.config
            .clone()
            .unwrap_or_else(|| Config::load_from_cwd(root))
    }

    // =========================================================================
    // Pre-Tool-Use Handler
    // =========================================================================

    /// Evaluate the pending write.
    ///
    /// State-shaped payloads are only governed when they target the state
    /// file; a write elsewhere that happens to carry a `state` key is not a
    /// workflow transition. Writes without a target path are classified by
    /// shape alone.
    fn handle_pre_tool_use(
        &self,
        input: &HookInput,
        config: &Config,
        root: &Path,
        cwd: &Path,
    ) -> Verdict {
        let Some(payload) = input.payload() else {
            return Verdict::Allow;
        };

        let mut event = GateEvent::decode(payload);
        if matches!(event, GateEvent::StateWrite { .. })
            && input.file_path().is_some()
            && !input.targets_file_named(file_name(&config.paths.state_file))
        {
            event = GateEvent::Other;
        }

        let stores = ProjectStores::open(config, root);
        self.gatekeeper(&stores, config).evaluate(&event, cwd)
    }

    // =========================================================================
    // Post-Tool-Use Handler
    // =========================================================================

    /// Record a pending trace for a newly written feature.
    ///
    /// Best effort: the write already happened, so failures surface as an
    /// advisory rather than a block.
    fn handle_post_tool_use(
        &self,
        input: &HookInput,
        config: &Config,
        root: &Path,
    ) -> Verdict {
        let targets_features = input.targets_file_named(file_name(&config.paths.feature_file));
        let carries_features = input.payload().is_some_and(|payload| {
            matches!(
                GateEvent::decode(payload),
                GateEvent::FeatureWrite { features, .. } if !features.is_empty()
            )
        });
        if !targets_features && !carries_features {
            return Verdict::Allow;
        }

        let stores = ProjectStores::open(config, root);
        let gatekeeper = self.gatekeeper(&stores, config);
        let Some(feature) = gatekeeper.untraced_feature() else {
            return Verdict::Allow;
        };

        let traced = create_provider(&config.embedding, root)
            .and_then(|provider| gatekeeper.trace_feature(&feature, provider.as_ref(), root));
        match traced {
            Ok(trace_id) => {
                tracing::info!(feature = %feature.id, trace = %trace_id, "recorded feature trace");
                Verdict::Allow
            }
            Err(e) => {
                tracing::warn!(feature = %feature.id, "feature trace not recorded: {}", e);
                Verdict::advisory(format!(
                    "Feature '{}' was written but its decision trace was not recorded: {}",
                    feature.id, e
                ))
            }
        }
    }

    fn gatekeeper<'a>(&'a self, stores: &'a ProjectStores, config: &Config) -> Gatekeeper<'a> {
        Gatekeeper::new(
            &stores.state,
            &stores.features,
            &stores.evidence,
            &self.vcs,
            &stores.traces,
            GuardPolicy::from(&config.guards),
        )
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// Read all input from stdin.
fn read_stdin() -> Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| GateError::storage("stdin", e))?;
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use crate::embedding::API_KEY_ENV;
    use crate::storage::TraceRepository;
    use crate::traces::{Outcome, TraceLedger};
    use crate::vcs::StaticStatus;
    use serde_json::json;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    struct Project {
        dir: TempDir,
        config: Config,
    }

    impl Project {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::create_dir_all(dir.path().join(".claude/progress")).unwrap();

            let mut config = Config::default();
            config.guards.evidence_path = dir.path().join("evidence/results.json");
            config.embedding.provider = ProviderKind::Hashing;
            config.embedding.dimension = 64;
            Self { dir, config }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn write(&self, relative: &str, value: serde_json::Value) {
            let path = self.root().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, value.to_string()).unwrap();
        }

        fn evidence(&self, all_passed: bool) {
            self.write("evidence/results.json", json!({ "all_passed": all_passed }));
        }

        fn runner(&self, vcs: StaticStatus) -> HookRunner<StaticStatus> {
            HookRunner::new(vcs)
                .with_project_dir(self.root())
                .with_config(self.config.clone())
        }

        fn input(&self, file: &str, content: &str) -> String {
            json!({
                "session_id": "s-1",
                "cwd": self.root(),
                "tool_name": "Write",
                "tool_input": {
                    "file_path": self.root().join(file),
                    "content": content,
                }
            })
            .to_string()
        }

        fn traces(&self) -> FileTraceRepository {
            FileTraceRepository::new(self.config.trace_dir(self.root()))
        }
    }

    #[test]
    fn test_hook_type_parse() {
        assert_eq!(HookType::parse("pre-tool-use"), Some(HookType::PreToolUse));
        assert_eq!(HookType::parse("PreToolUse"), Some(HookType::PreToolUse));
        assert_eq!(HookType::parse("post_tool_use"), Some(HookType::PostToolUse));
        assert_eq!(HookType::parse("stop"), None);
    }

    #[test]
    fn test_pre_blocks_illegal_transition() {
        let project = Project::new();
        project.write(".claude/progress/state.json", json!({"state": "INIT"}));

        let input = project.input(".claude/progress/state.json", r#"{"state": "COMPLETE"}"#);
        let verdict = project
            .runner(StaticStatus::clean())
            .run_with_input(HookType::PreToolUse, &input)
            .unwrap();

        assert!(verdict.is_blocked());
        let message = verdict.message().unwrap();
        assert!(message.contains("INIT"));
        assert!(message.contains("COMPLETE"));
    }

    #[test]
    fn test_pre_allows_legal_transition() {
        let project = Project::new();
        project.write(".claude/progress/state.json", json!({"state": "INIT"}));

        let input = project.input(".claude/progress/state.json", r#"{"state": "IMPLEMENT"}"#);
        let verdict = project
            .runner(StaticStatus::clean())
            .run_with_input(HookType::PreToolUse, &input)
            .unwrap();

        assert_eq!(verdict, Verdict::Allow);
    }

    #[test]
    fn test_pre_ignores_state_key_in_other_files() {
        let project = Project::new();
        project.write(".claude/progress/state.json", json!({"state": "INIT"}));

        let input = project.input("src/store.json", r#"{"state": "COMPLETE"}"#);
        let verdict = project
            .runner(StaticStatus::clean())
            .run_with_input(HookType::PreToolUse, &input)
            .unwrap();

        assert_eq!(verdict, Verdict::Allow);
    }

    #[test]
    fn test_pre_blocks_tested_without_evidence() {
        let project = Project::new();

        let input = project.input(
            ".claude/progress/feature-list.json",
            r#"{"features": [{"id": "F-1", "tested": true}]}"#,
        );
        let verdict = project
            .runner(StaticStatus::clean())
            .run_with_input(HookType::PreToolUse, &input)
            .unwrap();

        assert!(verdict.is_blocked());
        assert!(verdict.message().unwrap().contains("results.json"));
    }

    #[test]
    fn test_pre_blocks_tested_with_dirty_tree() {
        let project = Project::new();
        project.evidence(true);

        let input = project.input(
            ".claude/progress/feature-list.json",
            r#"{"features": [{"id": "F-1", "tested": true}]}"#,
        );
        let verdict = project
            .runner(StaticStatus::dirty([" M src/lib.rs"]))
            .run_with_input(HookType::PreToolUse, &input)
            .unwrap();

        assert!(verdict.is_blocked());
        assert!(verdict.message().unwrap().contains("src/lib.rs"));
    }

    #[test]
    fn test_pre_allows_tested_when_all_preconditions_hold() {
        let project = Project::new();
        project.evidence(true);

        let input = project.input(
            ".claude/progress/feature-list.json",
            r#"{"features": [{"id": "F-1", "tested": true, "last_commit": "abc1234"}]}"#,
        );
        let verdict = project
            .runner(StaticStatus::clean())
            .run_with_input(HookType::PreToolUse, &input)
            .unwrap();

        assert_eq!(verdict, Verdict::Allow);
    }

    #[test]
    fn test_pre_unparseable_input_fails_open() {
        let project = Project::new();
        let verdict = project
            .runner(StaticStatus::clean())
            .run_with_input(HookType::PreToolUse, "not json")
            .unwrap();
        assert_eq!(verdict, Verdict::Allow);
    }

    #[test]
    fn test_pre_unparseable_input_blocks_when_strict() {
        let mut project = Project::new();
        project.config.guards.strict = true;

        let verdict = project
            .runner(StaticStatus::clean())
            .run_with_input(HookType::PreToolUse, "not json")
            .unwrap();
        assert!(verdict.is_blocked());
    }

    #[test]
    fn test_pre_without_payload_allows() {
        let project = Project::new();
        let input = json!({"tool_name": "Bash", "tool_input": {"command": "ls"}}).to_string();

        let verdict = project
            .runner(StaticStatus::clean())
            .run_with_input(HookType::PreToolUse, &input)
            .unwrap();
        assert_eq!(verdict, Verdict::Allow);
    }

    #[test]
    fn test_post_records_feature_trace_once() {
        let project = Project::new();
        let features = json!({"features": [{"id": "F-7", "title": "Login form"}]});
        project.write(".claude/progress/feature-list.json", features.clone());
        project.write(".claude/progress/state.json", json!({"state": "IMPLEMENT"}));

        let input = project.input(".claude/progress/feature-list.json", &features.to_string());
        let runner = project.runner(StaticStatus::clean());

        assert_eq!(
            runner.run_with_input(HookType::PostToolUse, &input).unwrap(),
            Verdict::Allow
        );
        assert_eq!(
            runner.run_with_input(HookType::PostToolUse, &input).unwrap(),
            Verdict::Allow
        );

        let repo = project.traces();
        let collection = repo.load_collection().unwrap().unwrap();
        assert_eq!(collection.len(), 1);

        let trace = &collection.traces[0];
        assert_eq!(trace.document, "Feature created: Login form");
        assert_eq!(trace.metadata.outcome, Outcome::Pending);
        assert_eq!(trace.metadata.feature_id.as_deref(), Some("F-7"));
        assert_eq!(trace.metadata.state.as_deref(), Some("IMPLEMENT"));
    }

    #[test]
    #[serial]
    fn test_post_trace_failure_is_advisory() {
        let mut project = Project::new();
        project.config.embedding.provider = ProviderKind::Voyage;
        project.write(
            ".claude/progress/feature-list.json",
            json!({"features": [{"id": "F-1", "title": "Search"}]}),
        );

        let home = TempDir::new().unwrap();
        std::env::remove_var(API_KEY_ENV);
        std::env::set_var("GATEKEEPER_HOME", home.path());

        let input = project.input(".claude/progress/feature-list.json", "{}");
        let verdict = project
            .runner(StaticStatus::clean())
            .run_with_input(HookType::PostToolUse, &input)
            .unwrap();

        std::env::remove_var("GATEKEEPER_HOME");

        assert_eq!(verdict.exit_code(), 1);
        let message = verdict.message().unwrap();
        assert!(message.contains("F-1"));
        assert!(message.contains(API_KEY_ENV));
        assert!(TraceLedger::new(&project.traces()).load().unwrap().is_none());
    }

    #[test]
    fn test_post_ignores_unrelated_writes() {
        let project = Project::new();
        project.write(
            ".claude/progress/feature-list.json",
            json!({"features": [{"id": "F-1"}]}),
        );

        let input = project.input("README.md", "# hello");
        let verdict = project
            .runner(StaticStatus::clean())
            .run_with_input(HookType::PostToolUse, &input)
            .unwrap();

        assert_eq!(verdict, Verdict::Allow);
        assert!(project.traces().load_collection().unwrap().is_none());
    }
}
