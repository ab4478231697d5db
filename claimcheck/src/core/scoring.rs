//! Honesty scoring for verified self-reports.
//!
//! The score is `1 - critical / total_claims`. Every critical discrepancy the
//! verifier can emit corresponds to at least one counted claim (a test-result
//! mismatch to the two `tests_run` claims, a missing file to its own path), so
//! `critical <= total_claims` holds for verifier output. The ratio is still
//! capped at 1 so hand-built inputs cannot push the score below 0.

use crate::core::types::{Discrepancy, HonestyVerification, SelfReport, Severity};

/// Claims weighed by the test-result check.
const TESTS_RUN_CLAIMS: usize = 2;

/// Count verifiable claims in a report, floored at 1.
pub fn count_verifiable_claims(report: &SelfReport) -> usize {
    let tests = if report.claims_tests_run() {
        TESTS_RUN_CLAIMS
    } else {
        0
    };
    (tests + report.claimed_path_count()).max(1)
}

/// Score in `[0, 1]`, non-increasing in `critical` for a fixed `total_claims`.
pub fn honesty_score(critical: usize, total_claims: usize) -> f64 {
    let total = total_claims.max(1);
    let critical = critical.min(total);
    1.0 - critical as f64 / total as f64
}

impl HonestyVerification {
    /// Build a verification whose `verified` flag and score derive from `discrepancies`.
    pub fn from_discrepancies(discrepancies: Vec<Discrepancy>, total_claims: usize) -> Self {
        let critical = discrepancies
            .iter()
            .filter(|d| d.severity == Severity::Critical)
            .count();
        Self {
            verified: discrepancies.is_empty(),
            honesty_score: honesty_score(critical, total_claims),
            discrepancies,
        }
    }

    /// A verification with nothing to dispute.
    pub fn clean() -> Self {
        Self::from_discrepancies(Vec::new(), 1)
    }
}
