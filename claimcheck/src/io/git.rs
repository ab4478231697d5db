//! Git inspection of a worktree.
//!
//! Change detection only reads repository state: `git status --porcelain` for
//! the file lists and `git diff --stat` for line counts. Every failure degrades
//! to "no signal" so a broken or missing git never aborts a turn.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::core::diff_stat::{DiffStat, parse_diff_stat};
use crate::core::porcelain::partition_status;
use crate::core::types::GitChangeSummary;
use crate::io::config::GitConfig;
use crate::io::process::{ProbeError, run_with_timeout};

/// Source of file-level change information for a turn.
pub trait ChangeProbe {
    /// Summarize current changes, or `None` when there are none or inspection failed.
    fn detect_changes(&self) -> Option<GitChangeSummary>;
}

/// [`ChangeProbe`] backed by `git` subprocess calls in a working directory.
#[derive(Debug, Clone)]
pub struct GitInspector {
    workdir: PathBuf,
    program: String,
    status_timeout: Duration,
    diff_timeout: Duration,
    output_limit_bytes: usize,
    ignored_prefixes: Vec<String>,
}

impl GitInspector {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self::from_config(workdir, &GitConfig::default())
    }

    pub fn from_config(workdir: impl Into<PathBuf>, cfg: &GitConfig) -> Self {
        Self {
            workdir: workdir.into(),
            program: cfg.program.clone(),
            status_timeout: cfg.status_timeout(),
            diff_timeout: cfg.diff_timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
            ignored_prefixes: Vec::new(),
        }
    }

    /// Leave paths starting with `prefix` out of the change lists (e.g. the state root).
    pub fn ignoring_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_prefixes.push(prefix.into());
        self
    }

    fn is_ignored(&self, path: &str) -> bool {
        self.ignored_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Raw `git status --porcelain -z` output (NUL-separated, paths unquoted).
    pub fn status_porcelain(&self) -> Result<String, ProbeError> {
        self.run_capture(
            &["status", "--porcelain", "-z", "--untracked-files=all"],
            self.status_timeout,
        )
    }

    /// `git diff --stat HEAD`, retried once without a reference.
    pub fn diff_stat(&self) -> Result<String, ProbeError> {
        match self.run_capture(&["diff", "--stat", "HEAD"], self.diff_timeout) {
            Ok(text) => Ok(text),
            Err(err) => {
                debug!(err = %err, "diff against HEAD failed, retrying without reference");
                self.run_capture(&["diff", "--stat"], self.diff_timeout)
            }
        }
    }

    fn run_capture(&self, args: &[&str], timeout: Duration) -> Result<String, ProbeError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).current_dir(&self.workdir);
        let output = run_with_timeout(cmd, timeout, self.output_limit_bytes)?
            .into_success(&format!("{} {}", self.program, args.join(" ")))?;
        Ok(output.stdout_lossy())
    }
}

impl ChangeProbe for GitInspector {
    #[instrument(skip_all, fields(workdir = %self.workdir.display()))]
    fn detect_changes(&self) -> Option<GitChangeSummary> {
        let status = match self.status_porcelain() {
            Ok(text) => text,
            Err(err) => {
                warn!(err = %err, "git status failed, no git signal");
                return None;
            }
        };
        if status.trim_matches(['\0', '\n']).is_empty() {
            debug!("worktree has no changes");
            return None;
        }

        let mut partition = partition_status(&status);
        for list in [
            &mut partition.modified,
            &mut partition.added,
            &mut partition.deleted,
        ] {
            list.retain(|path| !self.is_ignored(path));
        }
        if partition.is_empty() {
            warn!("git status produced no classifiable entries");
            return None;
        }

        let (diff_stat_text, stat) = match self.diff_stat() {
            Ok(text) => {
                let stat = parse_diff_stat(&text);
                (text, stat)
            }
            Err(err) => {
                warn!(err = %err, "git diff --stat failed, counting 0 lines");
                (String::new(), DiffStat::default())
            }
        };

        info!(
            modified = partition.modified.len(),
            added = partition.added.len(),
            deleted = partition.deleted.len(),
            insertions = stat.insertions,
            deletions = stat.deletions,
            "detected git changes"
        );
        Some(GitChangeSummary {
            modified_files: partition.modified,
            added_files: partition.added,
            deleted_files: partition.deleted,
            diff_stat_text,
            insertions: stat.insertions,
            deletions: stat.deletions,
            observed_at: Utc::now(),
        })
    }
}
