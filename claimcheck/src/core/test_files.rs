//! Heuristic for recognizing test files by path.

use std::path::{Component, Path};

const TEST_PREFIXES: &[&str] = &["test_"];

const TEST_SUFFIXES: &[&str] = &[
    "_test.py",
    ".test.ts",
    ".test.tsx",
    ".test.js",
    ".test.jsx",
    ".spec.ts",
    ".spec.js",
    "_spec.rb",
    "_test.go",
    "_test.rs",
];

/// True if `path` looks like a test file.
///
/// Matches a conventional prefix or suffix on the file name (case-insensitive),
/// or any directory segment named `test`/`tests`.
pub fn is_test_file(path: &str) -> bool {
    let path = Path::new(path);
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
        return false;
    };
    if TEST_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
        || TEST_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
    {
        return true;
    }
    path.parent()
        .map(|dir| dir.components().any(is_test_dir))
        .unwrap_or(false)
}

fn is_test_dir(component: Component<'_>) -> bool {
    match component {
        Component::Normal(segment) => {
            let segment = segment.to_string_lossy();
            segment.eq_ignore_ascii_case("test") || segment.eq_ignore_ascii_case("tests")
        }
        _ => false,
    }
}

/// Keep the paths that look like test files, preserving order.
pub fn filter_test_files<'a, I>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    paths
        .into_iter()
        .filter(|path| is_test_file(path))
        .cloned()
        .collect()
}
