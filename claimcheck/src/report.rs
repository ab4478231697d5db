//! Human/agent-readable rendering of a verification result.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::types::{Discrepancy, HonestyVerification};

const VERIFICATION_TEMPLATE: &str = include_str!("templates/verification_context.txt");

#[derive(Debug, Serialize)]
struct DiscrepancyLine<'a> {
    severity: String,
    claim_kind: &'a str,
    claimed_value: &'a str,
    actual_value: &'a str,
}

impl<'a> DiscrepancyLine<'a> {
    fn from_discrepancy(d: &'a Discrepancy) -> Self {
        Self {
            severity: d.severity.to_string(),
            claim_kind: d.claim_kind.as_str(),
            claimed_value: &d.claimed_value,
            actual_value: &d.actual_value,
        }
    }
}

/// Render the verification context block injected into the next turn.
///
/// ```text
/// Honesty Score: 0.50
/// DISCREPANCIES FOUND:
/// - [CRITICAL] file_existence: claimed src/a.py exists, actual file not found
/// ```
pub fn format_verification_context(verification: &HonestyVerification) -> Result<String> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template("verification_context", VERIFICATION_TEMPLATE)
        .context("load verification template")?;
    let lines: Vec<DiscrepancyLine<'_>> = verification
        .discrepancies
        .iter()
        .map(DiscrepancyLine::from_discrepancy)
        .collect();
    let rendered = env
        .get_template("verification_context")?
        .render(context! {
            honesty_score => format!("{:.2}", verification.honesty_score),
            discrepancies => lines,
        })
        .context("render verification context")?;
    Ok(rendered.trim_end().to_string())
}
