//! Build tasks and the rebuild decision

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::error::BuildError;
use crate::kind::{BuildContext, BuildOutcome, Decision, TaskKind};
use crate::options::BuildOptions;
use crate::reporter::{BuildEvent, BuildReporter};
use crate::saved_deps::SavedDeps;
use crate::scheduler::BuildStatus;
use crate::stamp::OutputStamp;
use crate::subject::Subject;

/// Outcome of the most recent execution of a build task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Not executed yet in this invocation
    Pending,
    /// Artifacts were rebuilt
    Built,
    /// Nothing needed to be done
    UpToDate,
    /// The last execution failed
    Failed,
}

impl BuildState {
    fn to_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Built => 1,
            Self::UpToDate => 2,
            Self::Failed => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Built,
            2 => Self::UpToDate,
            3 => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// Build state shared between the worker executing a task and the workers
/// executing its dependents
#[derive(Debug, Clone, Default)]
pub struct BuiltCell(Arc<AtomicU8>);

impl BuiltCell {
    /// Current state
    pub fn get(&self) -> BuildState {
        BuildState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Publish a new state
    pub fn set(&self, state: BuildState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }
}

/// A task building one subject.
///
/// Constructed fresh for every invocation; only the saved dependency snapshot
/// and the subject's artifacts outlive the process.
pub struct BuildTask {
    subject: Subject,
    kind: Box<dyn TaskKind>,
    deps: Vec<Arc<BuildTask>>,
    options: Arc<BuildOptions>,
    reporter: Arc<dyn BuildReporter>,
    saved_deps: SavedDeps,
    state: BuiltCell,
    executed: AtomicBool,
}

impl BuildTask {
    /// Create a task for `subject` depending on `deps`, in order
    pub fn new(
        subject: Subject,
        kind: Box<dyn TaskKind>,
        deps: Vec<Arc<BuildTask>>,
        options: Arc<BuildOptions>,
        reporter: Arc<dyn BuildReporter>,
    ) -> Self {
        let saved_deps = SavedDeps::new(&options.output_dir, kind.kind_name(), &subject.name);
        Self {
            subject,
            kind,
            deps,
            options,
            reporter,
            saved_deps,
            state: BuiltCell::default(),
            executed: AtomicBool::new(false),
        }
    }

    /// The subject this task builds
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Subject name
    pub fn name(&self) -> &str {
        &self.subject.name
    }

    /// Dependency tasks, in declared order
    pub fn deps(&self) -> &[Arc<BuildTask>] {
        &self.deps
    }

    /// Current build state
    pub fn state(&self) -> BuildState {
        self.state.get()
    }

    /// Handle to the shared build state
    pub fn state_cell(&self) -> BuiltCell {
        self.state.clone()
    }

    /// Whether this task rebuilt its subject in this invocation
    pub fn built(&self) -> bool {
        self.state.get() == BuildState::Built
    }

    /// The newest artifact this task's subject has produced
    pub fn newest_output(&self) -> Option<OutputStamp> {
        self.kind.newest_output()
    }

    /// Snapshot location of this task's dependency list
    pub fn saved_deps(&self) -> &SavedDeps {
        &self.saved_deps
    }

    fn dep_names(&self) -> Vec<String> {
        self.deps.iter().map(|d| d.subject.name.clone()).collect()
    }

    fn context(&self) -> BuildContext<'_> {
        BuildContext {
            subject: &self.subject,
            options: &self.options,
            reporter: &*self.reporter,
        }
    }

    /// Execute the task, rebuilding the subject if needed.
    ///
    /// Runs at most once per task instance; later calls return the recorded
    /// state without doing any work. A failure is recorded and reported again
    /// by later calls.
    pub fn execute(&self) -> Result<BuildStatus, BuildError> {
        if self.executed.swap(true, Ordering::AcqRel) {
            trace!(subject = %self.subject, "already executed");
            return Ok(match self.state.get() {
                BuildState::Built => BuildStatus::Rebuilt,
                BuildState::UpToDate => BuildStatus::UpToDate,
                BuildState::Failed => {
                    BuildStatus::Failed(format!("{}: an earlier execution failed", self))
                }
                BuildState::Pending => BuildStatus::Skipped("already executed".to_string()),
            });
        }

        let result = self.execute_once();
        if result.is_err() {
            self.state.set(BuildState::Failed);
        }
        result
    }

    fn execute_once(&self) -> Result<BuildStatus, BuildError> {
        let ctx = self.context();

        if self.kind.build_forbidden(&ctx) {
            self.reporter.report(&BuildEvent::Skipped {
                subject: self.subject.name.clone(),
                reason: None,
            });
            return Ok(BuildStatus::Skipped("not selected".to_string()));
        }

        let clean_forbidden = self.kind.clean_forbidden(&ctx);
        let mut cleaned = false;
        let mut reason = None;

        if self.options.clean && !clean_forbidden {
            self.reporter.report(&BuildEvent::Cleaning {
                subject: self.subject.name.clone(),
            });
            self.kind
                .clean(&ctx, false)
                .map_err(|e| self.failure(e))?;
            cleaned = true;
            reason = Some("clean".to_string());
        }

        if reason.is_none() {
            reason = self.updated_dependencies_reason();
        }

        if reason.is_none() {
            let changed = self
                .saved_deps
                .changed(&self.dep_names())
                .map_err(|source| BuildError::SavedDeps {
                    subject: self.subject.name.clone(),
                    source,
                })?;
            if changed {
                reason = Some("dependencies were added, removed or re-ordered".to_string());
            }
        }

        let decision = match reason {
            Some(reason) => Decision::Build(reason),
            None => self.staleness(&ctx)?,
        };

        match decision {
            Decision::Build(reason) => self.rebuild(&ctx, reason, cleaned || clean_forbidden),
            Decision::Skip(reason) => {
                self.state.set(BuildState::UpToDate);
                self.reporter.report(&BuildEvent::Skipped {
                    subject: self.subject.name.clone(),
                    reason: Some(reason),
                });
                Ok(BuildStatus::UpToDate)
            }
        }
    }

    /// Remove the subject's artifacts outside of a build.
    ///
    /// Returns `false` when the kind forbids cleaning.
    pub fn clean(&self) -> Result<bool, BuildError> {
        let ctx = self.context();
        if self.kind.clean_forbidden(&ctx) {
            return Ok(false);
        }
        self.reporter.report(&BuildEvent::Cleaning {
            subject: self.subject.name.clone(),
        });
        self.kind.clean(&ctx, false).map_err(|e| self.failure(e))?;
        self.state.set(BuildState::Pending);
        Ok(true)
    }

    fn updated_dependencies_reason(&self) -> Option<String> {
        let updated: Vec<&Arc<BuildTask>> = self.deps.iter().filter(|d| d.built()).collect();
        let first = updated.first()?;
        if self.options.verbose {
            let names: Vec<&str> = updated.iter().map(|d| d.name()).collect();
            Some(format!("dependencies updated: {}", names.join(", ")))
        } else {
            Some(format!("dependency {} updated", first.subject))
        }
    }

    /// The newest output among the dependencies. Ties keep the first dependency.
    fn newest_input(&self) -> Option<OutputStamp> {
        let mut newest: Option<(OutputStamp, &BuildTask)> = None;
        for dep in &self.deps {
            if let Some(stamp) = dep.newest_output() {
                let replace = match &newest {
                    Some((current, _)) => stamp.is_newer_than(current),
                    None => true,
                };
                if replace {
                    newest = Some((stamp, dep));
                }
            }
        }

        let (stamp, dep) = newest?;
        debug!(
            subject = %self.subject,
            dependency = %dep.subject,
            output = %stamp,
            "newest dependency output"
        );
        Some(stamp)
    }

    fn staleness(&self, ctx: &BuildContext<'_>) -> Result<Decision, BuildError> {
        let mut newest_input = self.newest_input();
        if newest_input.is_some()
            && self.options.shallow_dependency_checks
            && !self.subject.kind.is_native()
        {
            newest_input = None;
        }

        if self.options.force {
            return Ok(Decision::Build("forced build".to_string()));
        }

        self.kind
            .needs_build(ctx, newest_input.as_ref())
            .map_err(|e| self.failure(e))
    }

    fn rebuild(
        &self,
        ctx: &BuildContext<'_>,
        reason: String,
        skip_clean: bool,
    ) -> Result<BuildStatus, BuildError> {
        let task = self.to_string();

        if !skip_clean {
            self.kind.clean(ctx, true).map_err(|e| self.failure(e))?;
        }

        let start = Instant::now();
        self.reporter.report(&BuildEvent::Started {
            subject: self.subject.name.clone(),
            task: task.clone(),
            reason,
        });

        let outcome = match self.kind.build(ctx) {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.failure(e)),
        };

        self.saved_deps
            .persist(&self.dep_names())
            .map_err(|source| BuildError::SavedDeps {
                subject: self.subject.name.clone(),
                source,
            })?;

        self.state.set(match outcome {
            BuildOutcome::Rebuilt => BuildState::Built,
            BuildOutcome::UpToDate => BuildState::UpToDate,
        });

        self.reporter.report(&BuildEvent::Completed {
            subject: self.subject.name.clone(),
            task,
            duration: start.elapsed(),
            outcome,
        });
        debug!(subject = %self.subject, "finished {}", self);

        Ok(match outcome {
            BuildOutcome::Rebuilt => BuildStatus::Rebuilt,
            BuildOutcome::UpToDate => BuildStatus::UpToDate,
        })
    }

    /// Attribute a failure to this task so concurrent builds can tell which one failed
    fn failure(&self, source: anyhow::Error) -> BuildError {
        let task = self.to_string();
        self.reporter.report(&BuildEvent::Failed {
            subject: self.subject.name.clone(),
            task: task.clone(),
            error: format!("{:#}", source),
        });
        BuildError::Failed {
            subject: self.subject.name.clone(),
            task,
            source,
        }
    }
}

impl fmt::Display for BuildTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind.describe(&self.subject))
    }
}

impl fmt::Debug for BuildTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildTask")
            .field("subject", &self.subject)
            .field("kind", &self.kind.kind_name())
            .field("deps", &self.dep_names())
            .field("state", &self.state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::CollectingReporter;
    use crate::testing::FakeKind;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn options(dir: &TempDir) -> BuildOptions {
        BuildOptions {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    fn task(
        name: &str,
        kind: FakeKind,
        deps: Vec<Arc<BuildTask>>,
        options: &BuildOptions,
    ) -> Arc<BuildTask> {
        Arc::new(BuildTask::new(
            Subject::project(name),
            Box::new(kind),
            deps,
            Arc::new(options.clone()),
            Arc::new(CollectingReporter::default()),
        ))
    }

    #[test]
    fn test_execute_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let opts = options(&temp);
        let kind = FakeKind::stale();
        let builds = kind.builds.clone();
        let t = task("core", kind, vec![], &opts);

        assert_eq!(t.execute().unwrap(), BuildStatus::Rebuilt);
        assert!(t.built());
        assert_eq!(t.execute().unwrap(), BuildStatus::Rebuilt);
        assert!(t.built());
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn test_up_to_date_leaves_built_false() {
        let temp = TempDir::new().unwrap();
        let opts = options(&temp);
        let kind = FakeKind::fresh();
        let builds = kind.builds.clone();
        let t = task("core", kind, vec![], &opts);

        assert_eq!(t.execute().unwrap(), BuildStatus::UpToDate);
        assert!(!t.built());
        assert_eq!(t.state(), BuildState::UpToDate);
        assert_eq!(builds.get(), 0);
    }

    #[test]
    fn test_rebuilt_dependency_forces_rebuild() {
        let temp = TempDir::new().unwrap();
        let opts = options(&temp);
        let dep = task("core", FakeKind::stale(), vec![], &opts);
        let kind = FakeKind::fresh();
        let builds = kind.builds.clone();
        let app = task("app", kind, vec![dep.clone()], &opts);

        // Snapshot matches so only the rebuilt dependency can trigger the build
        app.saved_deps().persist(&["core".to_string()]).unwrap();

        dep.execute().unwrap();
        assert_eq!(app.execute().unwrap(), BuildStatus::Rebuilt);
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn test_reordered_dependencies_force_rebuild() {
        let temp = TempDir::new().unwrap();
        let opts = options(&temp);
        let a = task("A", FakeKind::fresh(), vec![], &opts);
        let b = task("B", FakeKind::fresh(), vec![], &opts);
        let c = task("C", FakeKind::fresh(), vec![], &opts);

        // Earlier run saw [A, B, C]
        let first = task("app", FakeKind::fresh(), vec![a.clone(), b.clone(), c.clone()], &opts);
        first
            .saved_deps()
            .persist(&["A".to_string(), "B".to_string(), "C".to_string()])
            .unwrap();

        // Later run declares [A, C, B]; nothing else changed
        let kind = FakeKind::fresh();
        let builds = kind.builds.clone();
        let second = task("app", kind, vec![a, c, b], &opts);
        for dep in second.deps() {
            dep.execute().unwrap();
        }

        assert_eq!(second.execute().unwrap(), BuildStatus::Rebuilt);
        assert_eq!(builds.get(), 1);
        assert_eq!(
            second.saved_deps().load().unwrap(),
            Some(vec!["A".to_string(), "C".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_forbidden_build_changes_nothing() {
        let temp = TempDir::new().unwrap();
        let mut opts = options(&temp);
        opts.only = Some(vec!["other".to_string()]);
        opts.clean = true;
        let kind = FakeKind::stale();
        let builds = kind.builds.clone();
        let cleans = kind.cleans.clone();
        let t = task("core", kind, vec![], &opts);

        assert!(matches!(t.execute().unwrap(), BuildStatus::Skipped(_)));
        assert_eq!(t.state(), BuildState::Pending);
        assert_eq!(builds.get(), 0);
        assert_eq!(cleans.get(), 0);
    }

    #[test]
    fn test_clean_request_forces_rebuild_and_cleans_once() {
        let temp = TempDir::new().unwrap();
        let mut opts = options(&temp);
        opts.clean = true;
        let kind = FakeKind::fresh();
        let builds = kind.builds.clone();
        let cleans = kind.cleans.clone();
        let t = task("core", kind, vec![], &opts);

        assert_eq!(t.execute().unwrap(), BuildStatus::Rebuilt);
        assert_eq!(builds.get(), 1);
        assert_eq!(cleans.get(), 1);
    }

    #[test]
    fn test_stale_build_cleans_before_building() {
        let temp = TempDir::new().unwrap();
        let opts = options(&temp);
        let kind = FakeKind::stale();
        let cleans = kind.cleans.clone();
        let for_build = kind.cleaned_for_build.clone();
        let t = task("core", kind, vec![], &opts);

        t.execute().unwrap();
        assert_eq!(cleans.get(), 1);
        assert_eq!(for_build.get(), 1);
    }

    #[test]
    fn test_clean_forbidden_skips_all_cleaning() {
        let temp = TempDir::new().unwrap();
        let mut opts = options(&temp);
        opts.clean = true;
        let kind = FakeKind::stale().clean_forbidden();
        let cleans = kind.cleans.clone();
        let builds = kind.builds.clone();
        let t = task("core", kind, vec![], &opts);

        assert_eq!(t.execute().unwrap(), BuildStatus::Rebuilt);
        assert_eq!(cleans.get(), 0);
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn test_failure_is_remembered() {
        let temp = TempDir::new().unwrap();
        let opts = options(&temp);
        let kind = FakeKind::stale().failing();
        let builds = kind.builds.clone();
        let t = task("core", kind, vec![], &opts);

        assert!(t.execute().is_err());
        assert_eq!(t.state(), BuildState::Failed);
        assert!(!t.built());

        match t.execute().unwrap() {
            BuildStatus::Failed(msg) => assert!(msg.contains("an earlier execution failed")),
            other => panic!("unexpected status {:?}", other),
        }
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn test_standalone_clean() {
        let temp = TempDir::new().unwrap();
        let opts = options(&temp);
        let kind = FakeKind::stale();
        let cleans = kind.cleans.clone();
        let builds = kind.builds.clone();
        let t = task("core", kind, vec![], &opts);
        assert!(t.clean().unwrap());
        assert_eq!(cleans.get(), 1);
        assert_eq!(builds.get(), 0);

        let kind = FakeKind::stale().clean_forbidden();
        let cleans = kind.cleans.clone();
        let lib = task("lib", kind, vec![], &opts);
        assert!(!lib.clean().unwrap());
        assert_eq!(cleans.get(), 0);
    }

    #[test]
    fn test_force_overrides_fresh_kind() {
        let temp = TempDir::new().unwrap();
        let mut opts = options(&temp);
        opts.force = true;
        let reporter = Arc::new(CollectingReporter::default());
        let t = BuildTask::new(
            Subject::project("core"),
            Box::new(FakeKind::fresh()),
            vec![],
            Arc::new(opts),
            reporter.clone(),
        );

        assert_eq!(t.execute().unwrap(), BuildStatus::Rebuilt);
        assert!(reporter.events().iter().any(|e| matches!(
            e,
            BuildEvent::Started { reason, .. } if reason == "forced build"
        )));
    }

    #[test]
    fn test_build_returning_up_to_date_is_not_built() {
        let temp = TempDir::new().unwrap();
        let opts = options(&temp);
        let t = task("core", FakeKind::stale().outcome(BuildOutcome::UpToDate), vec![], &opts);

        assert_eq!(t.execute().unwrap(), BuildStatus::UpToDate);
        assert!(!t.built());
    }

    #[test]
    fn test_failure_is_attributed_and_not_persisted() {
        let temp = TempDir::new().unwrap();
        let opts = options(&temp);
        let dep = task("core", FakeKind::fresh(), vec![], &opts);
        let t = task("app", FakeKind::stale().failing(), vec![dep], &opts);

        let err = t.execute().unwrap_err();
        assert_eq!(err.subject(), Some("app"));
        assert!(err.to_string().contains("Building app"));
        assert!(!t.built());
        assert_eq!(t.saved_deps().load().unwrap(), None);
    }

    #[test]
    fn test_newest_input_reaches_kind() {
        let temp = TempDir::new().unwrap();
        let opts = options(&temp);
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        let new = SystemTime::UNIX_EPOCH + Duration::from_secs(20);
        let a = task("A", FakeKind::fresh().output("a.jar", old), vec![], &opts);
        let b = task("B", FakeKind::fresh().output("b.jar", new), vec![], &opts);
        let c = task("C", FakeKind::fresh().output("c.jar", new), vec![], &opts);

        let kind = FakeKind::fresh();
        let seen = kind.seen_input.clone();
        let app = task("app", kind, vec![a, b, c], &opts);
        app.saved_deps()
            .persist(&["A".to_string(), "B".to_string(), "C".to_string()])
            .unwrap();

        app.execute().unwrap();
        // B and C tie; the first one encountered wins
        assert_eq!(seen.get_path().as_deref(), Some("b.jar"));
    }

    #[test]
    fn test_shallow_checks_hide_newest_input_for_non_native() {
        let temp = TempDir::new().unwrap();
        let mut opts = options(&temp);
        opts.shallow_dependency_checks = true;
        let dep = task(
            "core",
            FakeKind::fresh().output("core.jar", SystemTime::now()),
            vec![],
            &opts,
        );

        let kind = FakeKind::fresh();
        let seen = kind.seen_input.clone();
        let app = task("app", kind, vec![dep.clone()], &opts);
        app.saved_deps().persist(&["core".to_string()]).unwrap();
        app.execute().unwrap();
        assert_eq!(seen.get_path(), None);

        let native_kind = FakeKind::fresh();
        let native_seen = native_kind.seen_input.clone();
        let native = Arc::new(BuildTask::new(
            Subject::new("lib", crate::subject::SubjectKind::NativeProject),
            Box::new(native_kind),
            vec![dep],
            Arc::new(opts.clone()),
            Arc::new(CollectingReporter::default()),
        ));
        native.saved_deps().persist(&["core".to_string()]).unwrap();
        native.execute().unwrap();
        assert_eq!(native_seen.get_path().as_deref(), Some("core.jar"));
    }

    #[test]
    fn test_built_state_visible_across_threads() {
        let temp = TempDir::new().unwrap();
        let opts = options(&temp);
        let dep = task("core", FakeKind::stale(), vec![], &opts);

        let worker = {
            let dep = dep.clone();
            std::thread::spawn(move || dep.execute().unwrap())
        };
        worker.join().unwrap();

        assert!(dep.built());
        assert_eq!(dep.state_cell().get(), BuildState::Built);
    }
}
