//! Extraction of the `<N> passed` count from test-runner output.

use std::sync::LazyLock;

use regex::Regex;

static PASSED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+) passed").unwrap());

/// Return the count from the first `<N> passed` occurrence, if any.
pub fn first_passed_count(text: &str) -> Option<u32> {
    PASSED_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
