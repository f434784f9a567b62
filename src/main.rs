//! Gatekeeper - workflow governance for AI coding agents
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use gatekeeper::config::{gatekeeper_home, resolve_project_root, Config};
use gatekeeper::core::{Gatekeeper, GuardPolicy, Verdict};
use gatekeeper::embedding::create_provider;
use gatekeeper::error::exit_codes;
use gatekeeper::hooks::{to_json, HookOutput, HookRunner, HookType};
use gatekeeper::storage::{
    FileEvidenceStore, FileFeatureStore, FileStateStore, FileTraceRepository,
};
use gatekeeper::vcs::GitStatus;

// =============================================================================
// CLI Definition
// =============================================================================

/// Gatekeeper - workflow governance for AI coding agents
#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// [Internal] Run a hook (JSON stdin, verdict as exit code). Called by the agent harness
    Hook {
        /// The hook event type
        #[arg(value_enum)]
        event: HookEvent,
        /// Project root (default: discovered from the hook's cwd)
        #[arg(long)]
        project_dir: Option<PathBuf>,
    },

    /// [User] Create the trace collection
    Init {
        /// Project root (default: discovered from the working directory)
        #[arg(long)]
        project_dir: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Agent] Record a decision trace
    Store {
        /// The decision text
        decision: String,
        /// Category tag
        #[arg(long, short)]
        category: Option<String>,
        /// Initial outcome (pending, success, failure)
        #[arg(long, short)]
        outcome: Option<String>,
        /// Session ID (default: from the state record)
        #[arg(long)]
        session_id: Option<String>,
        /// Feature ID (default: from the state record)
        #[arg(long)]
        feature_id: Option<String>,
        /// Project root (default: discovered from the working directory)
        #[arg(long)]
        project_dir: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Agent] Find similar past decisions
    Query {
        /// Query text
        query: String,
        /// Maximum number of results
        #[arg(long, short)]
        limit: Option<usize>,
        /// Only traces with this category
        #[arg(long, short)]
        category: Option<String>,
        /// Only traces with this outcome
        #[arg(long, short)]
        outcome: Option<String>,
        /// Project root (default: discovered from the working directory)
        #[arg(long)]
        project_dir: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Agent] Resolve a pending trace
    Outcome {
        /// Trace ID (trace_...)
        trace_id: String,
        /// success or failure
        outcome: String,
        /// Project root (default: discovered from the working directory)
        #[arg(long)]
        project_dir: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Agent] List traces awaiting an outcome
    Pending {
        /// Project root (default: discovered from the working directory)
        #[arg(long)]
        project_dir: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [User/Agent] Show workflow state and progress
    Status {
        /// Project root (default: discovered from the working directory)
        #[arg(long)]
        project_dir: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// [Agent] Move the workflow to a new state
    Transition {
        /// Target state (INIT, IMPLEMENT, TEST, COMPLETE, FIX_BROKEN)
        state: String,
        /// Project root (default: discovered from the working directory)
        #[arg(long)]
        project_dir: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum HookEvent {
    PreToolUse,
    PostToolUse,
}

impl From<HookEvent> for HookType {
    fn from(event: HookEvent) -> Self {
        match event {
            HookEvent::PreToolUse => HookType::PreToolUse,
            HookEvent::PostToolUse => HookType::PostToolUse,
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("gatekeeper error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Log to stderr, filtered by `GATEKEEPER_LOG` (default `warn`).
///
/// Stdout carries command output and hook verdicts, so nothing is logged there.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("GATEKEEPER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Set up the global panic handler.
///
/// On panic, logs to `<gatekeeper_home>/crash.log` and exits with code 3,
/// which the harness does not treat as a block.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("gatekeeper panic: {}", info);

        if let Some(home) = gatekeeper_home() {
            let _ = std::fs::create_dir_all(&home);
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Hook { event, project_dir } => run_hook(event.into(), project_dir),
        Commands::Init {
            project_dir,
            json,
            quiet,
        } => run_init(project_dir, json, quiet),
        Commands::Store {
            decision,
            category,
            outcome,
            session_id,
            feature_id,
            project_dir,
            json,
            quiet,
        } => {
            let options = gatekeeper::cli::store::StoreOptions {
                json,
                quiet,
                category,
                outcome,
                session_id,
                feature_id,
                project_dir: None,
            };
            run_store(&decision, options, project_dir)
        }
        Commands::Query {
            query,
            limit,
            category,
            outcome,
            project_dir,
            json,
            quiet,
        } => run_query(&query, limit, category, outcome, project_dir, json, quiet),
        Commands::Outcome {
            trace_id,
            outcome,
            project_dir,
            json,
            quiet,
        } => run_outcome(&trace_id, &outcome, project_dir, json, quiet),
        Commands::Pending {
            project_dir,
            json,
            quiet,
        } => run_pending(project_dir, json, quiet),
        Commands::Status {
            project_dir,
            json,
            quiet,
        } => run_status(project_dir, json, quiet),
        Commands::Transition {
            state,
            project_dir,
            json,
            quiet,
        } => run_transition(&state, project_dir, json, quiet),
    }
}

// =============================================================================
// Project Context
// =============================================================================

/// Resolved project root, its configuration and its file-backed stores.
struct Project {
    cwd: PathBuf,
    root: PathBuf,
    config: Config,
    state: FileStateStore,
    features: FileFeatureStore,
    evidence: FileEvidenceStore,
    traces: FileTraceRepository,
}

impl Project {
    fn open(project_dir: Option<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let cwd = std::env::current_dir()?;
        let root = resolve_project_root(project_dir.as_deref(), &cwd);
        let config = Config::load_from_cwd(&root);
        tracing::debug!(root = %root.display(), "resolved project root");

        Ok(Self {
            state: FileStateStore::new(config.state_path(&root)),
            features: FileFeatureStore::new(config.feature_path(&root)),
            evidence: FileEvidenceStore::new(&config.guards.evidence_path),
            traces: FileTraceRepository::new(config.trace_dir(&root)),
            cwd,
            root,
            config,
        })
    }

    fn root_display(&self) -> String {
        self.root.display().to_string()
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn run_hook(
    hook_type: HookType,
    project_dir: Option<PathBuf>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut runner = HookRunner::new(GitStatus);
    if let Some(dir) = project_dir {
        runner = runner.with_project_dir(dir);
    }

    // Fail-open: a hook that cannot run must not block the agent.
    let verdict = runner.run(hook_type).unwrap_or_else(|e| {
        tracing::warn!("hook failed: {} (fail-open)", e);
        Verdict::Allow
    });

    tracing::debug!(verdict = verdict.label(), "hook finished");
    if let Some(output) = HookOutput::for_verdict(&verdict) {
        println!("{}", to_json(&output)?);
    }
    if let Some(message) = verdict.message() {
        eprintln!("{}", message);
    }

    Ok(ExitCode::from(verdict.exit_code() as u8))
}

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::ALLOW as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

fn print_formatted(formatted: String) {
    if !formatted.is_empty() {
        print!("{}", formatted);
    }
}

fn run_init(
    project_dir: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use gatekeeper::cli::init::{InitCommand, InitOptions};

    let project = Project::open(project_dir)?;
    let progress_dir = project
        .config
        .state_path(&project.root)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| project.root.clone());

    let cmd = InitCommand::new(&project.traces, &project.config.embedding);
    let options = InitOptions { json, quiet };
    let output = cmd.run(&progress_dir, &options);
    print_formatted(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_store(
    decision: &str,
    mut options: gatekeeper::cli::store::StoreOptions,
    project_dir: Option<PathBuf>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use gatekeeper::cli::store::StoreCommand;

    let project = Project::open(project_dir)?;
    let factory = || create_provider(&project.config.embedding, &project.root);
    options.project_dir = Some(project.root_display());

    let cmd = StoreCommand::new(&project.traces, &project.state, &factory);
    let output = cmd.run(decision, &options);
    print_formatted(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

#[allow(clippy::too_many_arguments)]
fn run_query(
    query: &str,
    limit: Option<usize>,
    category: Option<String>,
    outcome: Option<String>,
    project_dir: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use gatekeeper::cli::query::{QueryCommand, QueryOptions};

    let project = Project::open(project_dir)?;
    let factory = || create_provider(&project.config.embedding, &project.root);

    let cmd = QueryCommand::new(&project.traces, &factory);
    let options = QueryOptions {
        json,
        quiet,
        limit,
        category,
        outcome,
    };
    let output = cmd.run(query, &options);
    print_formatted(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_outcome(
    trace_id: &str,
    outcome: &str,
    project_dir: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use gatekeeper::cli::outcome::{OutcomeCommand, OutcomeOptions};

    let project = Project::open(project_dir)?;
    let cmd = OutcomeCommand::new(&project.traces);
    let options = OutcomeOptions { json, quiet };
    let output = cmd.run(trace_id, outcome, &options);
    print_formatted(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_pending(
    project_dir: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use gatekeeper::cli::pending::{PendingCommand, PendingOptions};

    let project = Project::open(project_dir)?;
    let cmd = PendingCommand::new(&project.traces);
    let options = PendingOptions { json, quiet };
    let output = cmd.run(&options);
    print_formatted(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_status(
    project_dir: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use gatekeeper::cli::status::{StatusCommand, StatusOptions};

    let project = Project::open(project_dir)?;
    let cmd = StatusCommand::new(&project.state, &project.features, &project.traces);
    let options = StatusOptions { json, quiet };
    let output = cmd.run(&options);
    print_formatted(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(true))
}

fn run_transition(
    state: &str,
    project_dir: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use gatekeeper::cli::transition::{TransitionCommand, TransitionOptions};

    let project = Project::open(project_dir)?;
    let vcs = GitStatus;
    let gatekeeper = Gatekeeper::new(
        &project.state,
        &project.features,
        &project.evidence,
        &vcs,
        &project.traces,
        GuardPolicy::from(&project.config.guards),
    );

    let cmd = TransitionCommand::new(&gatekeeper, &project.state);
    let options = TransitionOptions { json, quiet };
    let output = cmd.run(state, &project.cwd, &options);
    print_formatted(cmd.format_output(&output, &options));

    if output.blocked {
        Ok(ExitCode::from(exit_codes::BLOCK as u8))
    } else {
        Ok(success_to_exit_code(output.success))
    }
}
