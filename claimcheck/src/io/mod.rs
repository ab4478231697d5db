//! I/O helpers: subprocess probes, self-report loading and per-turn state files.

pub mod config;
pub mod git;
pub mod layout;
pub mod process;
pub mod self_report;
pub mod state_store;
pub mod test_runner;
