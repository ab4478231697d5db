//! Parsing and classification of `git status --porcelain -z` output.

use tracing::warn;

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file (destination for renames).
    pub path: String,
}

/// Bucket a status entry is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Modified,
    Added,
    Deleted,
}

/// Paths grouped by change kind, each list in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPartition {
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub deleted: Vec<String>,
}

impl StatusPartition {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.deleted.is_empty()
    }
}

/// Classify an XY code.
///
/// Priority: `??` added, then any `M` modified, `A` added, `D` deleted, `R`
/// modified. Anything else is unclassified.
pub fn classify_code(code: &str) -> Option<ChangeKind> {
    if code == "??" {
        return Some(ChangeKind::Added);
    }
    if code.contains('M') {
        Some(ChangeKind::Modified)
    } else if code.contains('A') {
        Some(ChangeKind::Added)
    } else if code.contains('D') {
        Some(ChangeKind::Deleted)
    } else if code.contains('R') {
        Some(ChangeKind::Modified)
    } else {
        None
    }
}

/// Parse one NUL-terminated `git status --porcelain -z` record.
///
/// The record is two code characters, a space, then the path verbatim (no
/// quoting or escapes under `-z`).
pub fn parse_status_record(record: &str) -> Option<StatusEntry> {
    let code = record.get(..2)?;
    let path = record.get(2..)?.strip_prefix(' ')?;
    if path.is_empty() {
        return None;
    }
    Some(StatusEntry {
        code: code.to_string(),
        path: path.to_string(),
    })
}

/// True if the record is followed by a source-path record (renames and copies).
fn has_source_record(code: &str) -> bool {
    code.contains('R') || code.contains('C')
}

/// Split `git status --porcelain -z` output into entries, in emission order.
///
/// Rename and copy entries carry the destination path; the source path
/// record that follows them is consumed. Malformed records are skipped with
/// a warning.
pub fn parse_status_entries(output: &str) -> Vec<StatusEntry> {
    let mut entries = Vec::new();
    let mut records = output.split('\0');
    while let Some(record) = records.next() {
        if record.is_empty() {
            continue;
        }
        let Some(entry) = parse_status_record(record) else {
            warn!(record, "unexpected porcelain record, skipping");
            continue;
        };
        if has_source_record(&entry.code) && records.next().is_none() {
            warn!(path = %entry.path, "rename record without source path");
        }
        entries.push(entry);
    }
    entries
}

/// Partition `git status --porcelain -z` output into modified/added/deleted lists.
///
/// Malformed records and unclassified codes are skipped with a warning. No
/// sorting or de-duplication is applied.
pub fn partition_status(output: &str) -> StatusPartition {
    let mut partition = StatusPartition::default();
    for entry in parse_status_entries(output) {
        match classify_code(&entry.code) {
            Some(ChangeKind::Modified) => partition.modified.push(entry.path),
            Some(ChangeKind::Added) => partition.added.push(entry.path),
            Some(ChangeKind::Deleted) => partition.deleted.push(entry.path),
            None => {
                warn!(code = %entry.code, path = %entry.path, "unclassified status code, skipping");
            }
        }
    }
    partition
}
