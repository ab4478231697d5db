//! Canonical per-turn work state and its persisted record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{GitChangeSummary, SelfReport, TestOutcome, TurnNumber};

/// Which detection path produced a [`WorkState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    SelfReport,
    GitAndTest,
    GitOnly,
    TestOnly,
}

impl DetectionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionMethod::SelfReport => "self_report",
            DetectionMethod::GitAndTest => "git_and_test",
            DetectionMethod::GitOnly => "git_only",
            DetectionMethod::TestOnly => "test_only",
        }
    }
}

/// Signals a work state was synthesized from, tagged by detection path.
///
/// A self-report can only be carried by [`Evidence::SelfReport`], so the
/// detection method and the presence of a report cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    SelfReport {
        report: SelfReport,
        git: Option<GitChangeSummary>,
        tests: Option<TestOutcome>,
    },
    GitAndTest {
        git: GitChangeSummary,
        tests: TestOutcome,
    },
    /// `tests`, when present, did not run to completion.
    GitOnly {
        git: GitChangeSummary,
        tests: Option<TestOutcome>,
    },
    TestOnly {
        tests: TestOutcome,
    },
}

impl Evidence {
    pub fn detection_method(&self) -> DetectionMethod {
        match self {
            Evidence::SelfReport { .. } => DetectionMethod::SelfReport,
            Evidence::GitAndTest { .. } => DetectionMethod::GitAndTest,
            Evidence::GitOnly { .. } => DetectionMethod::GitOnly,
            Evidence::TestOnly { .. } => DetectionMethod::TestOnly,
        }
    }

    pub fn self_report(&self) -> Option<&SelfReport> {
        match self {
            Evidence::SelfReport { report, .. } => Some(report),
            _ => None,
        }
    }

    pub fn git_changes(&self) -> Option<&GitChangeSummary> {
        match self {
            Evidence::SelfReport { git, .. } => git.as_ref(),
            Evidence::GitAndTest { git, .. } | Evidence::GitOnly { git, .. } => Some(git),
            Evidence::TestOnly { .. } => None,
        }
    }

    pub fn test_outcome(&self) -> Option<&TestOutcome> {
        match self {
            Evidence::SelfReport { tests, .. } | Evidence::GitOnly { tests, .. } => tests.as_ref(),
            Evidence::GitAndTest { tests, .. } | Evidence::TestOnly { tests } => Some(tests),
        }
    }
}

/// What happened during one turn, as reconciled from the available signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkState {
    pub turn: TurnNumber,
    pub files_modified: Vec<String>,
    pub files_created: Vec<String>,
    pub tests_written: Vec<String>,
    pub tests_passed: bool,
    pub test_count: u32,
    pub observed_at: DateTime<Utc>,
    pub evidence: Evidence,
}

impl WorkState {
    pub fn detection_method(&self) -> DetectionMethod {
        self.evidence.detection_method()
    }

    pub fn self_report_present(&self) -> bool {
        self.evidence.self_report().is_some()
    }

    pub fn git_changes(&self) -> Option<&GitChangeSummary> {
        self.evidence.git_changes()
    }

    pub fn test_outcome(&self) -> Option<&TestOutcome> {
        self.evidence.test_outcome()
    }

    /// True if any file list is non-empty or any test was counted.
    pub fn has_work(&self) -> bool {
        any_work(
            [&self.files_modified, &self.files_created, &self.tests_written],
            self.test_count,
        )
    }

    pub fn total_files_changed(&self) -> usize {
        self.files_modified.len() + self.files_created.len()
    }

    /// Flatten into the persisted shape; the report body becomes a flag.
    pub fn to_record(&self) -> WorkStateRecord {
        WorkStateRecord {
            turn_number: self.turn,
            files_modified: self.files_modified.clone(),
            files_created: self.files_created.clone(),
            tests_written: self.tests_written.clone(),
            tests_passed: self.tests_passed,
            test_count: self.test_count,
            git_changes: self.git_changes().cloned(),
            test_outcome: self.test_outcome().cloned(),
            self_report_present: self.self_report_present(),
            observed_at: self.observed_at,
            detection_method: self.detection_method(),
        }
    }
}

/// Persisted form of a [`WorkState`] (`work_state_turn_<N>.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkStateRecord {
    pub turn_number: TurnNumber,
    pub files_modified: Vec<String>,
    pub files_created: Vec<String>,
    pub tests_written: Vec<String>,
    pub tests_passed: bool,
    pub test_count: u32,
    pub git_changes: Option<GitChangeSummary>,
    pub test_outcome: Option<TestOutcome>,
    pub self_report_present: bool,
    pub observed_at: DateTime<Utc>,
    pub detection_method: DetectionMethod,
}

impl WorkStateRecord {
    pub fn has_work(&self) -> bool {
        any_work(
            [&self.files_modified, &self.files_created, &self.tests_written],
            self.test_count,
        )
    }
}

fn any_work(lists: [&[String]; 3], test_count: u32) -> bool {
    test_count > 0 || lists.iter().any(|list| !list.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn observed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
    }

    fn outcome(count: u32) -> TestOutcome {
        TestOutcome {
            ran: true,
            passed: true,
            test_count: count,
            raw_output: format!("{count} passed"),
        }
    }

    fn state(evidence: Evidence) -> WorkState {
        WorkState {
            turn: TurnNumber::new(1).unwrap(),
            files_modified: Vec::new(),
            files_created: Vec::new(),
            tests_written: Vec::new(),
            tests_passed: false,
            test_count: 0,
            observed_at: observed_at(),
            evidence,
        }
    }

    #[test]
    fn has_work_false_when_empty() {
        let s = state(Evidence::TestOnly { tests: outcome(0) });
        assert!(!s.has_work());
        assert_eq!(s.total_files_changed(), 0);
    }

    #[test]
    fn has_work_from_any_list_or_count() {
        let mut s = state(Evidence::TestOnly { tests: outcome(0) });
        s.tests_written = vec!["tests/test_a.py".to_string()];
        assert!(s.has_work());

        let mut s = state(Evidence::TestOnly { tests: outcome(2) });
        s.test_count = 2;
        assert!(s.has_work());

        let mut s = state(Evidence::TestOnly { tests: outcome(0) });
        s.files_modified = vec!["a.py".to_string()];
        s.files_created = vec!["b.py".to_string()];
        assert!(s.has_work());
        assert_eq!(s.total_files_changed(), 2);
    }

    #[test]
    fn record_has_work_matches_state() {
        let empty = state(Evidence::TestOnly { tests: outcome(0) });
        assert!(!empty.to_record().has_work());

        let mut s = state(Evidence::TestOnly { tests: outcome(0) });
        s.files_created = vec!["b.py".to_string()];
        assert_eq!(s.to_record().has_work(), s.has_work());

        let mut s = state(Evidence::TestOnly { tests: outcome(1) });
        s.test_count = 1;
        assert!(s.to_record().has_work());
    }

    #[test]
    fn self_report_presence_follows_evidence() {
        let s = state(Evidence::SelfReport {
            report: SelfReport::default(),
            git: None,
            tests: None,
        });
        assert!(s.self_report_present());
        assert_eq!(s.detection_method(), DetectionMethod::SelfReport);

        let s = state(Evidence::TestOnly { tests: outcome(1) });
        assert!(!s.self_report_present());
        assert_eq!(s.detection_method(), DetectionMethod::TestOnly);
    }

    #[test]
    fn record_serializes_detection_method_and_flag() {
        let s = state(Evidence::SelfReport {
            report: SelfReport {
                files_created: vec!["x.py".to_string()],
                ..SelfReport::default()
            },
            git: None,
            tests: Some(outcome(3)),
        });
        let value = serde_json::to_value(s.to_record()).expect("serialize");
        assert_eq!(value["detection_method"], "self_report");
        assert_eq!(value["self_report_present"], true);
        assert_eq!(value["git_changes"], serde_json::Value::Null);
        assert_eq!(value["test_outcome"]["test_count"], 3);
        assert_eq!(value["turn_number"], 1);
        assert!(value.get("self_report").is_none());
    }

    #[test]
    fn detection_method_strings_match_serde() {
        for method in [
            DetectionMethod::SelfReport,
            DetectionMethod::GitAndTest,
            DetectionMethod::GitOnly,
            DetectionMethod::TestOnly,
        ] {
            let value = serde_json::to_value(method).expect("serialize");
            assert_eq!(value, method.as_str());
        }
    }
}
