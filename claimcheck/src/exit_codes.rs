//! Stable exit codes for claimcheck CLI commands.

/// Command succeeded; `verify` found every claim confirmed.
pub const OK: i32 = 0;
/// Invalid arguments, configuration or state files.
pub const INVALID: i32 = 1;
/// `reconcile` detected no work, or `verify` found no self-report.
pub const NO_WORK: i32 = 2;
/// `verify` found at least one discrepancy.
pub const DISCREPANCIES: i32 = 3;
