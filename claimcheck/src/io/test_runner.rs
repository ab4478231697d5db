//! Independent test execution for a worktree.

use std::cell::OnceCell;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::core::test_count::first_passed_count;
use crate::core::types::{ScopedPaths, TestOutcome};
use crate::io::config::TestsConfig;
use crate::io::process::{CommandOutput, ProbeError, run_with_timeout};

/// Source of observed test outcomes.
///
/// `run` never fails: tooling problems surface as an outcome with `ran == false`.
pub trait TestProbe {
    fn run(&self, scope: Option<&ScopedPaths>) -> TestOutcome;
}

/// [`TestProbe`] that spawns the configured test command.
///
/// Holds a single-slot cache for the unscoped run. Scoped runs always spawn
/// and never touch the slot. Use one instance per turn, or call [`reset`](Self::reset).
#[derive(Debug)]
pub struct TestRunner {
    workdir: PathBuf,
    command: Vec<String>,
    fallback_command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
    cache: OnceCell<TestOutcome>,
}

impl TestRunner {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self::from_config(workdir, &TestsConfig::default())
    }

    pub fn from_config(workdir: impl Into<PathBuf>, cfg: &TestsConfig) -> Self {
        Self {
            workdir: workdir.into(),
            command: cfg.command.clone(),
            fallback_command: cfg.fallback_command.clone(),
            timeout: cfg.timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
            cache: OnceCell::new(),
        }
    }

    /// Drop the cached unscoped outcome.
    pub fn reset(&mut self) {
        self.cache.take();
    }

    pub fn cached(&self) -> Option<&TestOutcome> {
        self.cache.get()
    }

    fn execute(&self, scope: Option<&ScopedPaths>) -> TestOutcome {
        let result = match self.spawn(&self.command, scope) {
            Err(ProbeError::Missing { program }) if !self.fallback_command.is_empty() => {
                debug!(program = %program, "test command missing, trying fallback");
                self.spawn(&self.fallback_command, scope)
            }
            other => other,
        };

        match result {
            Ok(output) => outcome_from_output(&output),
            Err(ProbeError::TimedOut { secs, .. }) => {
                warn!(timed_out = true, secs, "test run timed out");
                TestOutcome::not_run(format!("test run timed out after {secs}s"))
            }
            Err(err) => {
                warn!(err = %err, "test run failed");
                TestOutcome::not_run(format!("test run failed: {err}"))
            }
        }
    }

    fn spawn(
        &self,
        argv: &[String],
        scope: Option<&ScopedPaths>,
    ) -> Result<CommandOutput, ProbeError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(ProbeError::Missing {
                program: String::new(),
            });
        };
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(&self.workdir);
        if let Some(scope) = scope {
            cmd.args(scope.as_slice());
        }
        run_with_timeout(cmd, self.timeout, self.output_limit_bytes)
    }
}

fn outcome_from_output(output: &CommandOutput) -> TestOutcome {
    let stdout = output.stdout_lossy();
    let stderr = output.stderr_lossy();
    if !stderr.trim().is_empty() {
        debug!(stderr = %stderr.trim(), "test command stderr");
    }
    let passed = output.status.success();
    let test_count = first_passed_count(&stdout).unwrap_or(0);
    info!(exit_code = ?output.status.code(), passed, test_count, "test run finished");
    TestOutcome {
        ran: true,
        passed,
        test_count,
        raw_output: stdout,
    }
}

impl TestProbe for TestRunner {
    #[instrument(skip_all, fields(workdir = %self.workdir.display(), scoped = scope.is_some()))]
    fn run(&self, scope: Option<&ScopedPaths>) -> TestOutcome {
        match scope {
            Some(scope) => self.execute(Some(scope)),
            None => self.cache.get_or_init(|| self.execute(None)).clone(),
        }
    }
}
