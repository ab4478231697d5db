//! Parsing of `git diff --stat` summaries.

use std::sync::LazyLock;

use regex::Regex;

static INSERTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) insertions?\(\+\)").unwrap());
static DELETIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) deletions?\(-\)").unwrap());

/// Line counts from the trailing summary line of a diff-stat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStat {
    pub insertions: u32,
    pub deletions: u32,
}

/// Parse the last non-empty line of `git diff --stat` output.
///
/// The insertion and deletion clauses are extracted independently; a missing
/// clause counts as 0.
pub fn parse_diff_stat(text: &str) -> DiffStat {
    let Some(summary) = text.lines().rev().find(|line| !line.trim().is_empty()) else {
        return DiffStat::default();
    };
    DiffStat {
        insertions: extract(&INSERTIONS_RE, summary),
        deletions: extract(&DELETIONS_RE, summary),
    }
}

fn extract(re: &Regex, line: &str) -> u32 {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
