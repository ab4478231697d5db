//! Verification of an agent's self-report against the worktree.
//!
//! Three checks run in a fixed order: claimed test result, existence of
//! every claimed path, claimed test count. Tooling failures never produce a
//! discrepancy; only a confirmed mismatch does.

use std::cell::OnceCell;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::core::scoring::count_verifiable_claims;
use crate::core::test_count::first_passed_count;
use crate::core::types::{
    ClaimKind, Discrepancy, HonestyVerification, SelfReport, Severity, TestOutcome,
};
use crate::io::test_runner::TestProbe;

/// Checks self-report claims using an independent [`TestProbe`] and the filesystem.
pub struct ClaimVerifier<'a, T: TestProbe> {
    workdir: PathBuf,
    tests: &'a T,
}

impl<'a, T: TestProbe> ClaimVerifier<'a, T> {
    pub fn new(workdir: impl Into<PathBuf>, tests: &'a T) -> Self {
        Self {
            workdir: workdir.into(),
            tests,
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Verify `report`. Runs the test suite at most once.
    #[instrument(skip_all, fields(workdir = %self.workdir.display()))]
    pub fn verify(&self, report: &SelfReport) -> HonestyVerification {
        let observed: OnceCell<TestOutcome> = OnceCell::new();
        let outcome = || observed.get_or_init(|| self.tests.run(None));

        let mut discrepancies = Vec::new();
        if report.claims_tests_run() {
            discrepancies.extend(check_test_result(report, outcome()));
        }
        discrepancies.extend(self.check_file_existence(report));
        if let Some(summary) = report.test_output_summary.as_deref() {
            discrepancies.extend(check_test_count(summary, &outcome));
        }

        let verification =
            HonestyVerification::from_discrepancies(discrepancies, count_verifiable_claims(report));
        info!(
            verified = verification.verified,
            discrepancies = verification.discrepancies.len(),
            honesty_score = verification.honesty_score,
            "verified self-report"
        );
        verification
    }

    fn check_file_existence(&self, report: &SelfReport) -> Vec<Discrepancy> {
        report
            .claimed_paths()
            .filter_map(|path| {
                let actual = self.missing_reason(path)?;
                Some(Discrepancy {
                    claim_kind: ClaimKind::FileExistence,
                    claimed_value: format!("{path} exists"),
                    actual_value: actual.to_string(),
                    severity: Severity::Critical,
                })
            })
            .collect()
    }

    /// Why `claimed` does not count as an existing worktree file, if it doesn't.
    fn missing_reason(&self, claimed: &str) -> Option<&'static str> {
        if !stays_inside(Path::new(claimed)) {
            return Some("path outside worktree");
        }
        // An unreadable path counts as missing.
        match self.workdir.join(claimed).try_exists() {
            Ok(true) => None,
            _ => Some("file not found"),
        }
    }
}

/// True for relative paths that never climb above their starting directory.
fn stays_inside(path: &Path) -> bool {
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

fn check_test_result(report: &SelfReport, outcome: &TestOutcome) -> Option<Discrepancy> {
    if !outcome.ran {
        debug!("tests did not run, skipping test result check");
        return None;
    }
    let claimed = report.claims_tests_passed();
    (claimed != outcome.passed).then(|| Discrepancy {
        claim_kind: ClaimKind::TestResult,
        claimed_value: format!("tests_passed: {claimed}"),
        actual_value: format!("tests_passed: {}", outcome.passed),
        severity: Severity::Critical,
    })
}

fn check_test_count<'o>(
    summary: &str,
    outcome: impl FnOnce() -> &'o TestOutcome,
) -> Option<Discrepancy> {
    let Some(claimed) = first_passed_count(summary) else {
        debug!("no test count in summary, skipping count check");
        return None;
    };
    let outcome = outcome();
    if !outcome.ran {
        debug!("tests did not run, skipping count check");
        return None;
    }
    (claimed != outcome.test_count).then(|| Discrepancy {
        claim_kind: ClaimKind::TestCount,
        claimed_value: format!("{claimed} tests"),
        actual_value: format!("{} tests", outcome.test_count),
        severity: Severity::Warning,
    })
}
