//! Shared value types for turn verification.
//!
//! These types are plain values: they carry no handles to processes or files
//! and serialize to the stable JSON shapes persisted per turn.

use std::fmt;
use std::num::{NonZeroU32, ParseIntError};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 1-indexed turn number within a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TurnNumber(NonZeroU32);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnNumberError {
    #[error("turn number must be >= 1")]
    Zero,
    #[error("invalid turn number: {0}")]
    Parse(#[from] ParseIntError),
}

impl TurnNumber {
    pub fn new(turn: u32) -> Result<Self, TurnNumberError> {
        NonZeroU32::new(turn).map(Self).ok_or(TurnNumberError::Zero)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for TurnNumber {
    type Error = TurnNumberError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TurnNumber> for u32 {
    fn from(value: TurnNumber) -> Self {
        value.get()
    }
}

impl FromStr for TurnNumber {
    type Err = TurnNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim().parse::<u32>()?)
    }
}

impl fmt::Display for TurnNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task identifier used as a directory name under the state root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskIdError {
    #[error("task id must not be empty")]
    Empty,
    #[error("task id '{0}' must be a single path segment")]
    NotASegment(String),
}

impl TaskId {
    pub fn new(id: impl Into<String>) -> Result<Self, TaskIdError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(TaskIdError::Empty);
        }
        if trimmed == "."
            || trimmed == ".."
            || trimmed.contains('/')
            || trimmed.contains('\\')
        {
            return Err(TaskIdError::NotASegment(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TaskId {
    type Err = TaskIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-empty, ordered list of paths that restrict a test run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedPaths(Vec<String>);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("scoped test paths must not be empty")]
pub struct EmptyScopeError;

impl ScopedPaths {
    pub fn new<I, S>(paths: I) -> Result<Self, EmptyScopeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(EmptyScopeError);
        }
        Ok(Self(paths))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Result of one test-runner invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// False when the command could not be run to completion (missing tool, timeout).
    pub ran: bool,
    pub passed: bool,
    pub test_count: u32,
    /// Captured stdout, or a diagnostic when `ran` is false.
    pub raw_output: String,
}

impl TestOutcome {
    pub fn not_run(diagnostic: impl Into<String>) -> Self {
        Self {
            ran: false,
            passed: false,
            test_count: 0,
            raw_output: diagnostic.into(),
        }
    }
}

/// File-level changes observed in the worktree by one inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitChangeSummary {
    pub modified_files: Vec<String>,
    pub added_files: Vec<String>,
    pub deleted_files: Vec<String>,
    pub diff_stat_text: String,
    pub insertions: u32,
    pub deletions: u32,
    pub observed_at: DateTime<Utc>,
}

/// Which kind of claim a discrepancy refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    TestResult,
    FileExistence,
    TestCount,
}

impl ClaimKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimKind::TestResult => "test_result",
            ClaimKind::FileExistence => "file_existence",
            ClaimKind::TestCount => "test_count",
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Critical => "CRITICAL",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        };
        f.write_str(label)
    }
}

/// One mismatch between a claimed fact and an independently observed fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub claim_kind: ClaimKind,
    pub claimed_value: String,
    pub actual_value: String,
    pub severity: Severity,
}

/// Outcome of checking a self-report against observed state.
///
/// Built through [`HonestyVerification::from_discrepancies`] so that `verified`
/// and `honesty_score` always agree with the discrepancy list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HonestyVerification {
    pub verified: bool,
    pub discrepancies: Vec<Discrepancy>,
    pub honesty_score: f64,
}

impl HonestyVerification {
    pub fn critical_count(&self) -> usize {
        self.discrepancies
            .iter()
            .filter(|d| d.severity == Severity::Critical)
            .count()
    }
}

/// Claims an agent writes about its own turn.
///
/// Every field is optional in the file; lists default to empty and unknown
/// keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfReport {
    pub tests_run: Option<bool>,
    pub tests_passed: Option<bool>,
    pub test_output_summary: Option<String>,
    pub files_created: Vec<String>,
    pub files_modified: Vec<String>,
    pub tests_written: Vec<String>,
}

impl SelfReport {
    pub fn claims_tests_run(&self) -> bool {
        self.tests_run == Some(true)
    }

    pub fn claims_tests_passed(&self) -> bool {
        self.tests_passed == Some(true)
    }

    /// Every claimed path in created, modified, tests-written order.
    pub fn claimed_paths(&self) -> impl Iterator<Item = &str> {
        self.files_created
            .iter()
            .chain(&self.files_modified)
            .chain(&self.tests_written)
            .map(String::as_str)
    }

    pub fn claimed_path_count(&self) -> usize {
        self.files_created.len() + self.files_modified.len() + self.tests_written.len()
    }
}
