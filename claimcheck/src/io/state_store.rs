//! Per-turn persistence of work states and honesty verifications.
//!
//! Each turn owns its own files; a write replaces the previous contents
//! wholesale (temp file + rename) and nothing is ever appended.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::core::honesty_history::HonestyHistory;
use crate::core::types::{HonestyVerification, TaskId, TurnNumber};
use crate::core::work_state::{WorkState, WorkStateRecord};
use crate::io::layout::StateLayout;

/// Write `state` to `work_state_turn_<N>.json`, returning the path written.
pub fn persist_work_state(
    layout: &StateLayout,
    task_id: &TaskId,
    state: &WorkState,
) -> Result<PathBuf> {
    let path = layout.work_state_path(task_id, state.turn);
    write_json(&path, &state.to_record())?;
    info!(
        path = %path.display(),
        detection_method = state.detection_method().as_str(),
        "saved work state"
    );
    Ok(path)
}

pub fn load_work_state(path: &Path) -> Result<WorkStateRecord> {
    read_json(path).with_context(|| format!("load work state {}", path.display()))
}

/// Write `verification` to `honesty_turn_<N>.json`, returning the path written.
pub fn persist_verification(
    layout: &StateLayout,
    task_id: &TaskId,
    turn: TurnNumber,
    verification: &HonestyVerification,
) -> Result<PathBuf> {
    let path = layout.honesty_path(task_id, turn);
    write_json(&path, verification)?;
    debug!(path = %path.display(), "saved honesty verification");
    Ok(path)
}

pub fn load_verification(path: &Path) -> Result<HonestyVerification> {
    read_json(path).with_context(|| format!("load verification {}", path.display()))
}

/// Collect honesty scores for turns `1..=through`, oldest first.
///
/// Turns without a verification file are skipped; unreadable files are skipped
/// with a warning.
pub fn load_honesty_history(
    layout: &StateLayout,
    task_id: &TaskId,
    through: TurnNumber,
) -> HonestyHistory {
    let mut history = HonestyHistory::default();
    for turn in (1..=through.get()).filter_map(|n| TurnNumber::new(n).ok()) {
        let path = layout.honesty_path(task_id, turn);
        if !path.exists() {
            continue;
        }
        match load_verification(&path) {
            Ok(verification) => history.record(verification.honesty_score),
            Err(err) => warn!(err = %format!("{err:#}"), "skipping unreadable verification"),
        }
    }
    history
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

/// Serialize `value` to pretty-printed JSON with trailing newline.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value).context("serialize json")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Replace `path` with `contents`, creating parent directories.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut tmp_name = path
        .file_name()
        .with_context(|| format!("state path missing file name {}", path.display()))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = parent.join(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
