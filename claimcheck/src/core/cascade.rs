//! Cascade synthesis of a turn's [`WorkState`] from independent signals.
//!
//! Exactly one path is chosen per turn, highest fidelity first:
//! self-report, git + tests, git only, tests only. With none of them the turn
//! has no detected work and synthesis returns `None`.

use chrono::{DateTime, Utc};

use crate::core::test_count::first_passed_count;
use crate::core::test_files::filter_test_files;
use crate::core::types::{GitChangeSummary, SelfReport, TestOutcome, TurnNumber};
use crate::core::work_state::{Evidence, WorkState};

/// Signals gathered for one turn.
#[derive(Debug, Clone, Default)]
pub struct Signals {
    pub self_report: Option<SelfReport>,
    pub git: Option<GitChangeSummary>,
    pub tests: Option<TestOutcome>,
}

/// Synthesize the canonical work state for `turn`.
pub fn synthesize(
    turn: TurnNumber,
    signals: Signals,
    observed_at: DateTime<Utc>,
) -> Option<WorkState> {
    let Signals {
        self_report,
        git,
        tests,
    } = signals;

    if let Some(report) = self_report {
        return Some(from_self_report(turn, report, git, tests, observed_at));
    }

    let ran = tests.as_ref().is_some_and(|t| t.ran);
    match (git, tests) {
        (Some(git), Some(tests)) if ran => {
            let (passed, count) = (tests.passed, tests.test_count);
            Some(from_git(turn, git, passed, count, observed_at, |git| {
                Evidence::GitAndTest { git, tests }
            }))
        }
        (Some(git), tests) => Some(from_git(turn, git, false, 0, observed_at, |git| {
            Evidence::GitOnly { git, tests }
        })),
        (None, Some(tests)) if ran => Some(WorkState {
            turn,
            files_modified: Vec::new(),
            files_created: Vec::new(),
            tests_written: Vec::new(),
            tests_passed: tests.passed,
            test_count: tests.test_count,
            observed_at,
            evidence: Evidence::TestOnly { tests },
        }),
        (None, _) => None,
    }
}

fn from_self_report(
    turn: TurnNumber,
    report: SelfReport,
    git: Option<GitChangeSummary>,
    tests: Option<TestOutcome>,
    observed_at: DateTime<Utc>,
) -> WorkState {
    // An observed run overrides whatever the report claims about tests.
    let (tests_passed, test_count) = match tests.as_ref().filter(|t| t.ran) {
        Some(observed) => (observed.passed, observed.test_count),
        None => (
            report.claims_tests_passed(),
            report
                .test_output_summary
                .as_deref()
                .and_then(first_passed_count)
                .unwrap_or(0),
        ),
    };
    WorkState {
        turn,
        files_modified: report.files_modified.clone(),
        files_created: report.files_created.clone(),
        tests_written: report.tests_written.clone(),
        tests_passed,
        test_count,
        observed_at,
        evidence: Evidence::SelfReport { report, git, tests },
    }
}

fn from_git(
    turn: TurnNumber,
    git: GitChangeSummary,
    tests_passed: bool,
    test_count: u32,
    observed_at: DateTime<Utc>,
    evidence: impl FnOnce(GitChangeSummary) -> Evidence,
) -> WorkState {
    let files_modified = git.modified_files.clone();
    let files_created = git.added_files.clone();
    let tests_written = filter_test_files(files_created.iter().chain(&files_modified));
    WorkState {
        turn,
        files_modified,
        files_created,
        tests_written,
        tests_passed,
        test_count,
        observed_at,
        evidence: evidence(git),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::work_state::DetectionMethod;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
    }

    fn turn() -> TurnNumber {
        TurnNumber::new(2).unwrap()
    }

    fn git(modified: &[&str], added: &[&str]) -> GitChangeSummary {
        GitChangeSummary {
            modified_files: modified.iter().map(|s| s.to_string()).collect(),
            added_files: added.iter().map(|s| s.to_string()).collect(),
            deleted_files: Vec::new(),
            diff_stat_text: String::new(),
            insertions: 0,
            deletions: 0,
            observed_at: now(),
        }
    }

    fn ran(passed: bool, count: u32) -> TestOutcome {
        TestOutcome {
            ran: true,
            passed,
            test_count: count,
            raw_output: format!("{count} passed"),
        }
    }

    #[test]
    fn observed_tests_override_report_claim() {
        let report = SelfReport {
            tests_run: Some(true),
            tests_passed: Some(true),
            test_output_summary: Some("12 passed".to_string()),
            files_modified: vec!["claimed.py".to_string()],
            ..SelfReport::default()
        };
        let state = synthesize(
            turn(),
            Signals {
                self_report: Some(report),
                git: Some(git(&["other.py"], &[])),
                tests: Some(ran(false, 3)),
            },
            now(),
        )
        .expect("state");

        assert_eq!(state.detection_method(), DetectionMethod::SelfReport);
        assert!(!state.tests_passed);
        assert_eq!(state.test_count, 3);
        assert_eq!(state.files_modified, vec!["claimed.py"]);
        assert!(state.git_changes().is_some());
    }

    #[test]
    fn report_claim_used_when_tests_did_not_run() {
        let report = SelfReport {
            tests_passed: Some(true),
            test_output_summary: Some("7 passed in 1.2s".to_string()),
            ..SelfReport::default()
        };
        let state = synthesize(
            turn(),
            Signals {
                self_report: Some(report),
                git: None,
                tests: Some(TestOutcome::not_run("timed out")),
            },
            now(),
        )
        .expect("state");

        assert!(state.tests_passed);
        assert_eq!(state.test_count, 7);
        assert!(state.self_report_present());
    }

    #[test]
    fn empty_report_still_yields_state_without_work() {
        let state = synthesize(
            turn(),
            Signals {
                self_report: Some(SelfReport::default()),
                ..Signals::default()
            },
            now(),
        )
        .expect("state");
        assert_eq!(state.detection_method(), DetectionMethod::SelfReport);
        assert!(!state.has_work());
    }

    #[test]
    fn git_and_test_path() {
        let state = synthesize(
            turn(),
            Signals {
                self_report: None,
                git: Some(git(&["src/a.py", "src/b.py"], &[])),
                tests: Some(ran(true, 4)),
            },
            now(),
        )
        .expect("state");

        assert_eq!(state.detection_method(), DetectionMethod::GitAndTest);
        assert!(state.tests_written.is_empty());
        assert!(state.tests_passed);
        assert_eq!(state.test_count, 4);
        assert_eq!(state.files_modified, vec!["src/a.py", "src/b.py"]);
    }

    #[test]
    fn git_only_path_ignores_unrun_tests() {
        let state = synthesize(
            turn(),
            Signals {
                self_report: None,
                git: Some(git(&["src/a.py"], &["tests/test_new.py"])),
                tests: Some(TestOutcome::not_run("pytest not found")),
            },
            now(),
        )
        .expect("state");

        assert_eq!(state.detection_method(), DetectionMethod::GitOnly);
        assert!(!state.tests_passed);
        assert_eq!(state.test_count, 0);
        assert_eq!(state.files_created, vec!["tests/test_new.py"]);
        assert_eq!(state.tests_written, vec!["tests/test_new.py"]);
        assert!(state.test_outcome().is_some_and(|t| !t.ran));
    }

    #[test]
    fn git_only_path_without_test_signal() {
        let state = synthesize(
            turn(),
            Signals {
                git: Some(git(&["a.py"], &[])),
                ..Signals::default()
            },
            now(),
        )
        .expect("state");
        assert_eq!(state.detection_method(), DetectionMethod::GitOnly);
        assert!(state.test_outcome().is_none());
    }

    #[test]
    fn test_only_path() {
        let state = synthesize(
            turn(),
            Signals {
                tests: Some(ran(false, 2)),
                ..Signals::default()
            },
            now(),
        )
        .expect("state");

        assert_eq!(state.detection_method(), DetectionMethod::TestOnly);
        assert!(state.files_modified.is_empty());
        assert!(state.files_created.is_empty());
        assert!(!state.tests_passed);
        assert_eq!(state.test_count, 2);
        assert!(state.git_changes().is_none());
    }

    #[test]
    fn no_signals_means_no_work() {
        assert!(synthesize(turn(), Signals::default(), now()).is_none());
        let only_failed_tests = Signals {
            tests: Some(TestOutcome::not_run("timed out")),
            ..Signals::default()
        };
        assert!(synthesize(turn(), only_failed_tests, now()).is_none());
    }

    #[test]
    fn tests_written_collects_added_then_modified() {
        let state = synthesize(
            turn(),
            Signals {
                git: Some(git(
                    &["src/app.test.ts", "src/app.ts"],
                    &["pkg/handler_test.go", "README.md"],
                )),
                tests: Some(ran(true, 1)),
                ..Signals::default()
            },
            now(),
        )
        .expect("state");
        assert_eq!(
            state.tests_written,
            vec!["pkg/handler_test.go", "src/app.test.ts"]
        );
    }
}
