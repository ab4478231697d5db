//! Deterministic per-task, per-turn file layout under the state root.
//!
//! ```text
//! <root>/config.toml
//! <root>/<task-id>/self_report_turn_<N>.json
//! <root>/<task-id>/work_state_turn_<N>.json
//! <root>/<task-id>/honesty_turn_<N>.json
//! ```

use std::path::{Path, PathBuf};

use crate::core::types::{TaskId, TurnNumber};

/// Directory name used for the state root inside a worktree by default.
pub const DEFAULT_STATE_DIR: &str = ".claimcheck";

#[derive(Debug, Clone)]
pub struct StateLayout {
    root: PathBuf,
}

impl StateLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at `<worktree>/.claimcheck`.
    pub fn in_worktree(worktree: &Path) -> Self {
        Self::new(worktree.join(DEFAULT_STATE_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn task_dir(&self, task_id: &TaskId) -> PathBuf {
        self.root.join(task_id.as_str())
    }

    pub fn self_report_path(&self, task_id: &TaskId, turn: TurnNumber) -> PathBuf {
        self.task_dir(task_id)
            .join(format!("self_report_turn_{turn}.json"))
    }

    pub fn work_state_path(&self, task_id: &TaskId, turn: TurnNumber) -> PathBuf {
        self.task_dir(task_id)
            .join(format!("work_state_turn_{turn}.json"))
    }

    pub fn honesty_path(&self, task_id: &TaskId, turn: TurnNumber) -> PathBuf {
        self.task_dir(task_id).join(format!("honesty_turn_{turn}.json"))
    }
}
