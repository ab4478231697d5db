//! Reconciliation against real git repositories and scripted test commands.
//!
//! Fake test executables live in a separate temp directory so they never show
//! up as worktree changes.
#![cfg(unix)]

use std::path::Path;

use claimcheck::core::types::{TaskId, TurnNumber};
use claimcheck::core::work_state::DetectionMethod;
use claimcheck::io::config::TestsConfig;
use claimcheck::io::git::GitInspector;
use claimcheck::io::layout::StateLayout;
use claimcheck::io::state_store::load_work_state;
use claimcheck::io::test_runner::TestRunner;
use claimcheck::reconcile::StateReconciler;
use claimcheck::test_support::{TestRepo, fake_test_command, invocation_count};

fn task() -> TaskId {
    TaskId::new("TASK-42").expect("task id")
}

fn turn(n: u32) -> TurnNumber {
    TurnNumber::new(n).expect("turn")
}

fn runner_for(worktree: &Path, command: Vec<String>, timeout_secs: u64) -> TestRunner {
    let cfg = TestsConfig {
        command,
        fallback_command: Vec::new(),
        timeout_secs,
        ..TestsConfig::default()
    };
    TestRunner::from_config(worktree, &cfg)
}

fn fake_runner(worktree: &Path, bin: &Path, stdout: &str, exit_code: i32) -> TestRunner {
    let fake = fake_test_command(bin, "pytest", stdout, exit_code).expect("fake pytest");
    runner_for(worktree, vec![fake.display().to_string()], 10)
}

#[test]
fn modified_sources_with_passing_tests_use_git_and_test() {
    let repo = TestRepo::new().expect("repo");
    repo.write_file("src/a.py", "a = 1\n").expect("write");
    repo.write_file("src/b.py", "b = 1\n").expect("write");
    repo.commit_all("seed").expect("commit");
    repo.write_file("src/a.py", "a = 2\n").expect("write");
    repo.write_file("src/b.py", "b = 2\n").expect("write");

    let bin = tempfile::tempdir().expect("bin");
    let tests = fake_runner(repo.path(), bin.path(), "....\n4 passed in 0.05s", 0);
    let git = GitInspector::new(repo.path());
    let layout = StateLayout::in_worktree(repo.path());
    let reconciler = StateReconciler::new(task(), layout, &git, &tests);

    let state = reconciler.reconcile(turn(1)).expect("state");
    assert_eq!(state.detection_method(), DetectionMethod::GitAndTest);
    assert_eq!(state.files_modified, vec!["src/a.py", "src/b.py"]);
    assert!(state.files_created.is_empty());
    assert!(state.tests_written.is_empty());
    assert!(state.tests_passed);
    assert_eq!(state.test_count, 4);
    let git_changes = state.git_changes().expect("git changes");
    assert_eq!(git_changes.insertions, 2);
    assert_eq!(git_changes.deletions, 2);
}

#[test]
fn observed_failure_overrides_self_report_claim() {
    let repo = TestRepo::new().expect("repo");
    repo.write_file("src/feature.py", "x = 1\n").expect("write");
    repo.write_file(
        ".claimcheck/TASK-42/self_report_turn_2.json",
        r#"{"tests_run": true, "tests_passed": true, "test_output_summary": "9 passed",
            "files_created": ["src/feature.py"], "tests_written": ["tests/test_feature.py"]}"#,
    )
    .expect("write report");

    let bin = tempfile::tempdir().expect("bin");
    let tests = fake_runner(repo.path(), bin.path(), "1 failed, 2 passed in 0.1s", 1);
    let git = GitInspector::new(repo.path()).ignoring_prefix(".claimcheck/");
    let layout = StateLayout::in_worktree(repo.path());
    let reconciler = StateReconciler::new(task(), layout.clone(), &git, &tests);

    let state = reconciler.reconcile(turn(2)).expect("state");
    assert_eq!(state.detection_method(), DetectionMethod::SelfReport);
    assert!(!state.tests_passed);
    assert_eq!(state.test_count, 2);
    assert_eq!(state.files_created, vec!["src/feature.py"]);
    assert_eq!(state.tests_written, vec!["tests/test_feature.py"]);
    let git_changes = state.git_changes().expect("git changes");
    assert_eq!(git_changes.added_files, vec!["src/feature.py"]);

    let path = reconciler.persist(&state).expect("persist");
    assert_eq!(path, layout.work_state_path(&task(), turn(2)));
    let record = load_work_state(&path).expect("load");
    assert!(record.self_report_present);
    assert_eq!(record.detection_method, DetectionMethod::SelfReport);
    assert_eq!(record.turn_number, turn(2));
}

#[test]
fn timed_out_tests_on_clean_repo_is_no_work() {
    let repo = TestRepo::new().expect("repo");
    let bin = tempfile::tempdir().expect("bin");
    let slow = bin.path().join("slow-pytest");
    std::fs::write(&slow, "#!/bin/sh\nexec sleep 5\n").expect("write");
    claimcheck::test_support::make_executable(&slow).expect("chmod");

    let tests = runner_for(repo.path(), vec![slow.display().to_string()], 1);
    let git = GitInspector::new(repo.path());
    let reconciler =
        StateReconciler::new(task(), StateLayout::in_worktree(repo.path()), &git, &tests);

    assert!(reconciler.reconcile(turn(1)).is_none());
    let cached = tests.cached().expect("cached outcome");
    assert!(!cached.ran);
    assert!(cached.raw_output.contains("timed out"));
}

#[test]
fn missing_test_tooling_degrades_to_git_only() {
    let repo = TestRepo::new().expect("repo");
    repo.write_file("tests/test_api.py", "def test_x(): pass\n").expect("write");
    repo.write_file("src/api.py", "x = 1\n").expect("write");

    let tests = runner_for(repo.path(), vec!["claimcheck-missing-pytest".to_string()], 10);
    let git = GitInspector::new(repo.path());
    let reconciler =
        StateReconciler::new(task(), StateLayout::in_worktree(repo.path()), &git, &tests);

    let state = reconciler.reconcile(turn(1)).expect("state");
    assert_eq!(state.detection_method(), DetectionMethod::GitOnly);
    assert_eq!(state.files_created, vec!["src/api.py", "tests/test_api.py"]);
    assert_eq!(state.tests_written, vec!["tests/test_api.py"]);
    assert!(!state.tests_passed);
    assert_eq!(state.test_count, 0);
}

#[test]
fn non_repository_with_passing_tests_is_test_only() {
    let worktree = tempfile::tempdir().expect("worktree");
    let bin = tempfile::tempdir().expect("bin");
    let tests = fake_runner(worktree.path(), bin.path(), "3 passed", 0);
    let git = GitInspector::new(worktree.path());
    let reconciler =
        StateReconciler::new(task(), StateLayout::in_worktree(worktree.path()), &git, &tests);

    let state = reconciler.reconcile(turn(1)).expect("state");
    assert_eq!(state.detection_method(), DetectionMethod::TestOnly);
    assert!(state.files_modified.is_empty());
    assert!(state.tests_passed);
    assert_eq!(state.test_count, 3);
    assert_eq!(invocation_count(bin.path(), "pytest"), 1);
}
