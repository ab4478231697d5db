//! Per-turn reconciliation of self-report, git and test signals.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, instrument};

use crate::core::cascade::{Signals, synthesize};
use crate::core::types::{TaskId, TurnNumber};
use crate::core::work_state::WorkState;
use crate::io::git::ChangeProbe;
use crate::io::layout::StateLayout;
use crate::io::self_report::load_self_report;
use crate::io::state_store::persist_work_state;
use crate::io::test_runner::TestProbe;

/// Builds one [`WorkState`] per turn for a task.
pub struct StateReconciler<'a, G: ChangeProbe, T: TestProbe> {
    task_id: TaskId,
    layout: StateLayout,
    git: &'a G,
    tests: &'a T,
}

impl<'a, G: ChangeProbe, T: TestProbe> StateReconciler<'a, G, T> {
    pub fn new(task_id: TaskId, layout: StateLayout, git: &'a G, tests: &'a T) -> Self {
        Self {
            task_id,
            layout,
            git,
            tests,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Reconcile `turn`, or `None` when no signal shows any work.
    ///
    /// Git and the test suite are always probed, even when a self-report
    /// exists, so observed test results can override the claimed ones.
    #[instrument(skip_all, fields(task_id = %self.task_id, turn = %turn))]
    pub fn reconcile(&self, turn: TurnNumber) -> Option<WorkState> {
        let self_report = load_self_report(&self.layout.self_report_path(&self.task_id, turn));
        let git = self.git.detect_changes();
        let tests = Some(self.tests.run(None));

        let state = synthesize(
            turn,
            Signals {
                self_report,
                git,
                tests,
            },
            Utc::now(),
        );
        match &state {
            Some(state) => info!(
                detection_method = state.detection_method().as_str(),
                has_work = state.has_work(),
                files_changed = state.total_files_changed(),
                "reconciled turn"
            ),
            None => info!("no work detected"),
        }
        state
    }

    /// Write `state` to its per-turn file.
    pub fn persist(&self, state: &WorkState) -> Result<PathBuf> {
        persist_work_state(&self.layout, &self.task_id, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::work_state::DetectionMethod;
    use crate::io::state_store::load_work_state;
    use crate::test_support::{FixedChangeProbe, FixedTestProbe, git_summary, passing_outcome};
    use std::fs;

    fn task() -> TaskId {
        TaskId::new("TASK-7").expect("task id")
    }

    fn turn(n: u32) -> TurnNumber {
        TurnNumber::new(n).expect("turn")
    }

    #[test]
    fn self_report_wins_and_is_persisted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let layout = StateLayout::new(temp.path());
        let report_path = layout.self_report_path(&task(), turn(1));
        fs::create_dir_all(report_path.parent().expect("parent")).expect("mkdir");
        fs::write(
            &report_path,
            r#"{"tests_passed": true, "files_created": ["src/new.py"]}"#,
        )
        .expect("write");

        let git = FixedChangeProbe::new(Some(git_summary(&["other.py"], &[])));
        let tests = FixedTestProbe::new(passing_outcome(6));
        let reconciler = StateReconciler::new(task(), layout.clone(), &git, &tests);

        let state = reconciler.reconcile(turn(1)).expect("state");
        assert_eq!(state.detection_method(), DetectionMethod::SelfReport);
        assert_eq!(state.files_created, vec!["src/new.py"]);
        assert_eq!(state.test_count, 6);
        assert_eq!(tests.calls(), 1);

        let path = reconciler.persist(&state).expect("persist");
        assert_eq!(path, layout.work_state_path(&task(), turn(1)));
        let record = load_work_state(&path).expect("load");
        assert!(record.self_report_present);
        assert_eq!(record.detection_method, DetectionMethod::SelfReport);
        assert!(record.git_changes.is_some());
    }

    #[test]
    fn malformed_report_falls_through_to_git() {
        let temp = tempfile::tempdir().expect("tempdir");
        let layout = StateLayout::new(temp.path());
        let report_path = layout.self_report_path(&task(), turn(2));
        fs::create_dir_all(report_path.parent().expect("parent")).expect("mkdir");
        fs::write(&report_path, "{not json").expect("write");

        let git = FixedChangeProbe::new(Some(git_summary(&["a.py"], &[])));
        let tests = FixedTestProbe::new(passing_outcome(1));
        let state = StateReconciler::new(task(), layout, &git, &tests)
            .reconcile(turn(2))
            .expect("state");
        assert_eq!(state.detection_method(), DetectionMethod::GitAndTest);
    }

    #[test]
    fn nothing_observed_is_no_work() {
        let temp = tempfile::tempdir().expect("tempdir");
        let git = FixedChangeProbe::new(None);
        let tests = FixedTestProbe::new(crate::core::types::TestOutcome::not_run("missing"));
        let state = StateReconciler::new(task(), StateLayout::new(temp.path()), &git, &tests)
            .reconcile(turn(1));
        assert!(state.is_none());
    }

    #[test]
    fn persist_overwrites_previous_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let layout = StateLayout::new(temp.path());
        let tests = FixedTestProbe::new(passing_outcome(2));

        let first_git = FixedChangeProbe::new(Some(git_summary(&["a.py", "b.py"], &[])));
        let reconciler = StateReconciler::new(task(), layout.clone(), &first_git, &tests);
        let state = reconciler.reconcile(turn(3)).expect("state");
        reconciler.persist(&state).expect("persist");

        let second_git = FixedChangeProbe::new(Some(git_summary(&["c.py"], &[])));
        let reconciler = StateReconciler::new(task(), layout.clone(), &second_git, &tests);
        let state = reconciler.reconcile(turn(3)).expect("state");
        let path = reconciler.persist(&state).expect("persist");

        let record = load_work_state(&path).expect("load");
        assert_eq!(record.files_modified, vec!["c.py"]);
    }
}
