//! Turn verifier for autonomous coding agents.
//!
//! Reconciles an agent's self-report (`<state-root>/<task>/self_report_turn_<N>.json`)
//! with git and an independent test run, and scores how honest the report was.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use claimcheck::core::types::{TaskId, TurnNumber};
use claimcheck::exit_codes;
use claimcheck::io::config::{ClaimcheckConfig, load_config, write_config};
use claimcheck::io::git::GitInspector;
use claimcheck::io::layout::StateLayout;
use claimcheck::io::self_report::read_self_report;
use claimcheck::io::state_store::{load_honesty_history, persist_verification};
use claimcheck::io::test_runner::TestRunner;
use claimcheck::logging;
use claimcheck::reconcile::StateReconciler;
use claimcheck::report::format_verification_context;
use claimcheck::verify::ClaimVerifier;

#[derive(Parser)]
#[command(
    name = "claimcheck",
    version,
    about = "Verify an agent's claimed work against git and an independent test run"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct LocationArgs {
    /// Worktree the agent works in.
    #[arg(long, default_value = ".")]
    worktree: PathBuf,
    /// State directory (default: `<worktree>/.claimcheck`).
    #[arg(long)]
    state_root: Option<PathBuf>,
}

#[derive(Args)]
struct TurnArgs {
    #[command(flatten)]
    location: LocationArgs,
    #[arg(long)]
    task_id: TaskId,
    /// 1-indexed turn number.
    #[arg(long)]
    turn: TurnNumber,
}

#[derive(Subcommand)]
enum Command {
    /// Write `<state-root>/config.toml` with default settings if missing.
    Init {
        #[command(flatten)]
        location: LocationArgs,
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Build and persist the turn's work state; prints it as JSON.
    Reconcile {
        #[command(flatten)]
        turn: TurnArgs,
        /// Print the work state without writing it.
        #[arg(long)]
        no_persist: bool,
    },
    /// Verify the turn's self-report and persist the result.
    Verify {
        #[command(flatten)]
        turn: TurnArgs,
        /// Print the verification as JSON instead of the text block.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    logging::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                exit_codes::INVALID
            } else {
                exit_codes::OK
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Init { location, force } => cmd_init(&location, force),
        Command::Reconcile { turn, no_persist } => cmd_reconcile(&turn, no_persist),
        Command::Verify { turn, json } => cmd_verify(&turn, json),
    }
}

/// Resolved worktree and state layout for a command.
struct Workspace {
    worktree: PathBuf,
    layout: StateLayout,
}

impl Workspace {
    fn resolve(location: &LocationArgs) -> Result<Self> {
        let worktree = fs::canonicalize(&location.worktree)
            .with_context(|| format!("resolve worktree {}", location.worktree.display()))?;
        let layout = match &location.state_root {
            Some(root) => StateLayout::new(
                resolve_state_root(root)
                    .with_context(|| format!("resolve state root {}", root.display()))?,
            ),
            None => StateLayout::in_worktree(&worktree),
        };
        Ok(Self { worktree, layout })
    }

    fn config(&self) -> Result<ClaimcheckConfig> {
        load_config(&self.layout.config_path())
    }

    /// Git inspector that ignores the state root when it lives inside the worktree.
    fn git(&self, cfg: &ClaimcheckConfig) -> GitInspector {
        let git = GitInspector::from_config(&self.worktree, &cfg.git);
        match state_prefix(&self.worktree, self.layout.root()) {
            Some(prefix) => git.ignoring_prefix(prefix),
            None => git,
        }
    }
}

/// Absolute state root with symlinks resolved in its deepest existing ancestor.
///
/// The root itself may not exist yet; the missing tail is appended unchanged.
fn resolve_state_root(root: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(root)?;
    let mut existing = absolute.as_path();
    let mut tail = Vec::new();
    while !existing.exists() {
        let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
            return Ok(absolute);
        };
        tail.push(name.to_os_string());
        existing = parent;
    }
    let mut resolved = fs::canonicalize(existing)?;
    resolved.extend(tail.iter().rev());
    Ok(resolved)
}

fn state_prefix(worktree: &Path, state_root: &Path) -> Option<String> {
    let relative = state_root.strip_prefix(worktree).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(format!("{}/", segments.join("/")))
}

fn cmd_init(location: &LocationArgs, force: bool) -> Result<i32> {
    let workspace = Workspace::resolve(location)?;
    let path = workspace.layout.config_path();
    if force || !path.exists() {
        write_config(&path, &ClaimcheckConfig::default())?;
    }
    println!("{}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_reconcile(args: &TurnArgs, no_persist: bool) -> Result<i32> {
    let workspace = Workspace::resolve(&args.location)?;
    let cfg = workspace.config()?;
    let git = workspace.git(&cfg);
    let tests = TestRunner::from_config(&workspace.worktree, &cfg.tests);
    let reconciler = StateReconciler::new(
        args.task_id.clone(),
        workspace.layout.clone(),
        &git,
        &tests,
    );

    let Some(state) = reconciler.reconcile(args.turn) else {
        eprintln!("no work detected for {} turn {}", args.task_id, args.turn);
        return Ok(exit_codes::NO_WORK);
    };
    if !no_persist {
        reconciler.persist(&state)?;
    }
    let payload =
        serde_json::to_string_pretty(&state.to_record()).context("serialize work state")?;
    println!("{payload}");
    Ok(exit_codes::OK)
}

fn cmd_verify(args: &TurnArgs, json: bool) -> Result<i32> {
    let workspace = Workspace::resolve(&args.location)?;
    let report_path = workspace.layout.self_report_path(&args.task_id, args.turn);
    if !report_path.exists() {
        eprintln!("no self-report at {}", report_path.display());
        return Ok(exit_codes::NO_WORK);
    }
    let report = read_self_report(&report_path)?;
    let cfg = workspace.config()?;
    let tests = TestRunner::from_config(&workspace.worktree, &cfg.tests);
    let verification = ClaimVerifier::new(&workspace.worktree, &tests).verify(&report);

    persist_verification(&workspace.layout, &args.task_id, args.turn, &verification)?;
    let history = load_honesty_history(&workspace.layout, &args.task_id, args.turn);
    if history.has_sustained_concern() {
        warn!(
            task_id = %args.task_id,
            rolling_average = history.rolling_average().unwrap_or_default(),
            "sustained low honesty"
        );
    }

    if json {
        let payload =
            serde_json::to_string_pretty(&verification).context("serialize verification")?;
        println!("{payload}");
    } else {
        println!("{}", format_verification_context(&verification)?);
    }
    Ok(if verification.verified {
        exit_codes::OK
    } else {
        exit_codes::DISCREPANCIES
    })
}
