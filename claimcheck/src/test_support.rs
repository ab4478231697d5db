//! Test-only helpers: fixed probes, throwaway git repos and fake test commands.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::{TimeZone, Utc};

use crate::core::types::{GitChangeSummary, ScopedPaths, TestOutcome};
use crate::io::git::ChangeProbe;
use crate::io::test_runner::TestProbe;

/// [`TestProbe`] returning the same outcome every time and counting calls.
#[derive(Debug)]
pub struct FixedTestProbe {
    outcome: TestOutcome,
    calls: Cell<usize>,
}

impl FixedTestProbe {
    pub fn new(outcome: TestOutcome) -> Self {
        Self {
            outcome,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl TestProbe for FixedTestProbe {
    fn run(&self, _scope: Option<&ScopedPaths>) -> TestOutcome {
        self.calls.set(self.calls.get() + 1);
        self.outcome.clone()
    }
}

/// [`ChangeProbe`] returning a fixed summary (or none).
#[derive(Debug)]
pub struct FixedChangeProbe {
    summary: Option<GitChangeSummary>,
}

impl FixedChangeProbe {
    pub fn new(summary: Option<GitChangeSummary>) -> Self {
        Self { summary }
    }
}

impl ChangeProbe for FixedChangeProbe {
    fn detect_changes(&self) -> Option<GitChangeSummary> {
        self.summary.clone()
    }
}

/// A completed, passing run reporting `count` tests.
pub fn passing_outcome(count: u32) -> TestOutcome {
    TestOutcome {
        ran: true,
        passed: true,
        test_count: count,
        raw_output: format!("{count} passed in 0.01s"),
    }
}

/// A completed run with failures and `count` passing tests.
pub fn failing_outcome(count: u32) -> TestOutcome {
    TestOutcome {
        ran: true,
        passed: false,
        test_count: count,
        raw_output: format!("1 failed, {count} passed in 0.01s"),
    }
}

/// Deterministic change summary with no deletions or line counts.
pub fn git_summary(modified: &[&str], added: &[&str]) -> GitChangeSummary {
    GitChangeSummary {
        modified_files: modified.iter().map(|s| s.to_string()).collect(),
        added_files: added.iter().map(|s| s.to_string()).collect(),
        deleted_files: Vec::new(),
        diff_stat_text: String::new(),
        insertions: 0,
        deletions: 0,
        observed_at: Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default(),
    }
}

/// Git repository in a temp directory with a local identity configured.
pub struct TestRepo {
    dir: tempfile::TempDir,
}

impl TestRepo {
    /// Repository with one commit containing `README.md`.
    pub fn new() -> Result<Self> {
        let repo = Self::empty()?;
        repo.write_file("README.md", "# fixture\n")?;
        repo.commit_all("initial")?;
        Ok(repo)
    }

    /// Repository with no commits.
    pub fn empty() -> Result<Self> {
        let repo = Self {
            dir: tempfile::tempdir().context("create temp repo dir")?,
        };
        repo.git(&["init", "-q"])?;
        repo.git(&["config", "user.email", "fixture@example.com"])?;
        repo.git(&["config", "user.name", "Fixture"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write_file(&self, rel: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Stage every change, including deletions and renames.
    pub fn stage_all(&self) -> Result<()> {
        self.git(&["add", "-A"])
    }

    /// Stage everything and commit.
    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.stage_all()?;
        self.git(&["commit", "-q", "-m", message])
    }

    fn git(&self, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Mark `path` executable.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).with_context(|| format!("chmod {}", path.display()))
}

/// Write an executable script `<dir>/<name>` that prints `stdout` and exits with `exit_code`.
///
/// Each invocation appends its arguments as one line to `<dir>/<name>.calls`;
/// see [`invocation_count`] and [`invocation_args`].
#[cfg(unix)]
pub fn fake_test_command(dir: &Path, name: &str, stdout: &str, exit_code: i32) -> Result<PathBuf> {
    let script = dir.join(name);
    let calls = calls_path(dir, name);
    let body = format!(
        "#!/bin/sh\necho \"$*\" >> {}\nprintf '%s\\n' {}\nexit {exit_code}\n",
        shell_quote(&calls.display().to_string()),
        shell_quote(stdout),
    );
    fs::write(&script, body).with_context(|| format!("write {}", script.display()))?;
    make_executable(&script)?;
    Ok(script)
}

/// Number of times the fake command `name` in `dir` has run.
pub fn invocation_count(dir: &Path, name: &str) -> usize {
    invocation_args(dir, name).len()
}

/// Argument lines recorded by the fake command `name` in `dir`, oldest first.
pub fn invocation_args(dir: &Path, name: &str) -> Vec<String> {
    fs::read_to_string(calls_path(dir, name))
        .map(|text| text.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

fn calls_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.calls"))
}

#[cfg(unix)]
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
