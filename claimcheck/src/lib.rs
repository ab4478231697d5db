//! Independent verification of an autonomous agent's turn.
//!
//! Each turn, an agent may write a self-report claiming what it changed and
//! whether tests passed. This crate reconciles that claim with what git and an
//! independent test run actually show, and scores the claim's honesty. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (parsing, cascade synthesis, scoring).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (git and test subprocesses, state files).
//!   Behind the [`io::git::ChangeProbe`] and [`io::test_runner::TestProbe`] traits
//!   so tests can substitute fixed signals.
//!
//! Orchestration modules ([`reconcile`], [`verify`], [`report`]) coordinate
//! core logic with I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod reconcile;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod verify;
