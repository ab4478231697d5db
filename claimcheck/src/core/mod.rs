//! Deterministic, pure logic for turn verification.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values (command output text, parsed reports) and return deterministic
//! outputs suitable for tests.

pub mod cascade;
pub mod diff_stat;
pub mod honesty_history;
pub mod porcelain;
pub mod scoring;
pub mod test_count;
pub mod test_files;
pub mod types;
pub mod work_state;
