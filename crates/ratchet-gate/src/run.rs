//! Run-scoped coordination of gate tasks

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::debug;

use crate::error::GateError;
use crate::reporter::{GateEvent, GateReporter};
use crate::selection::{Selection, Selector};
use crate::task::{TaskRecord, TaskSpec, TaskState};
use crate::timing::timestamp;

/// Switches fixed for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Evaluate selection and log, but never enter task bodies
    pub dry_run: bool,
    /// Emit BEGIN/END/ABORT events
    pub log: bool,
    /// Turn soft failures into aborts
    pub strict_mode: bool,
    /// Working directory for recorded commands
    pub workdir: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            log: true,
            strict_mode: false,
            workdir: PathBuf::from("."),
        }
    }
}

/// Coordinator of one gate run.
///
/// Owns the selection state, the titles seen so far, the tasks that were
/// selected and the transcript of top-level commands.
pub struct GateRun {
    selector: Selector,
    options: RunOptions,
    reporter: Arc<dyn GateReporter>,
    started: Instant,
    titles: HashSet<String>,
    declared: Vec<TaskSpec>,
    records: Vec<TaskRecord>,
    commands: Vec<String>,
}

impl GateRun {
    /// Start a run
    pub fn new(selection: Selection, options: RunOptions, reporter: Arc<dyn GateReporter>) -> Self {
        Self {
            selector: Selector::new(selection),
            options,
            reporter,
            started: Instant::now(),
            titles: HashSet::new(),
            declared: Vec::new(),
            records: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// The selection policy of this run
    pub fn selection(&self) -> &Selection {
        self.selector.selection()
    }

    /// Whether this is a dry run
    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Whether soft failures abort
    pub fn strict_mode(&self) -> bool {
        self.options.strict_mode
    }

    /// Tasks that were selected, in completion order
    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    /// Every task declared so far, selected or not
    pub fn declared(&self) -> &[TaskSpec] {
        &self.declared
    }

    /// Top-level commands executed so far
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn into_records(self) -> Vec<TaskRecord> {
        self.records
    }

    fn stamp(&self, suffix: &str) -> String {
        timestamp(Local::now(), Some(self.elapsed()), suffix)
    }

    pub(crate) fn log_begin(&self, title: &str) {
        if self.options.log {
            self.reporter.report(&GateEvent::Begin {
                stamp: self.stamp(" BEGIN: "),
                title: title.to_string(),
            });
        }
    }

    pub(crate) fn log_end(&self, title: &str, duration: Duration) {
        if self.options.log {
            self.reporter.report(&GateEvent::End {
                stamp: self.stamp(" END:   "),
                title: title.to_string(),
                duration,
            });
        }
    }

    pub(crate) fn log_abort(&self, title: &str, duration: Duration) {
        if self.options.log {
            self.reporter.report(&GateEvent::Abort {
                stamp: self.stamp(" ABORT: "),
                title: title.to_string(),
                duration,
            });
        }
    }

    pub(crate) fn report(&self, event: GateEvent) {
        self.reporter.report(&event);
    }

    /// Declare a task and run `body` if it is selected.
    ///
    /// Selection is evaluated exactly once, here. In a dry run the body is
    /// never entered but the task is still recorded. An error from the body
    /// logs ABORT for the task and is returned to halt the run.
    pub fn task<F>(&mut self, spec: TaskSpec, body: F) -> anyhow::Result<TaskState>
    where
        F: FnOnce(&mut TaskScope<'_>) -> anyhow::Result<()>,
    {
        if !self.titles.insert(spec.title.clone()) {
            return Err(GateError::DuplicateTitle(spec.title).into());
        }
        self.declared.push(spec.clone());

        let mut state = TaskState::Pending;
        if !self
            .selector
            .is_selected(&spec.title, &spec.legacy_titles, &spec.tags)
        {
            state.advance(TaskState::Skipped);
            if self.options.log {
                self.reporter.report(&GateEvent::Skipped {
                    title: spec.title.clone(),
                });
            }
            return Ok(state);
        }
        state.advance(TaskState::Active);

        let start = Instant::now();
        self.log_begin(&spec.title);

        if self.options.dry_run {
            state.advance(TaskState::Stopped);
            let duration = start.elapsed();
            self.log_end(&spec.title, duration);
            self.records.push(TaskRecord::new(spec, state, duration));
            return Ok(state);
        }

        state.advance(TaskState::Running);
        let result = {
            let mut scope = TaskScope {
                run: self,
                title: spec.title.clone(),
                state,
            };
            body(&mut scope)
        };
        let duration = start.elapsed();

        match result {
            Ok(()) => {
                state.advance(TaskState::Stopped);
                self.log_end(&spec.title, duration);
                self.records.push(TaskRecord::new(spec, state, duration));
                Ok(state)
            }
            Err(e) => {
                state.advance(TaskState::Aborted);
                self.log_abort(&spec.title, duration);
                self.records.push(TaskRecord::new(spec, state, duration));
                Err(e)
            }
        }
    }

    /// Add a line to the command transcript without running anything
    pub fn record_command(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.reporter.report(&GateEvent::Command { line: line.clone() });
        self.commands.push(line);
    }
}

/// Handle given to a running task body
pub struct TaskScope<'a> {
    run: &'a mut GateRun,
    title: String,
    state: TaskState,
}

impl TaskScope<'_> {
    /// Title of the running task
    pub fn title(&self) -> &str {
        &self.title
    }

    /// State of the running task, `Running` while its body executes
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Whether soft failures abort
    pub fn strict_mode(&self) -> bool {
        self.run.strict_mode()
    }

    /// The selection policy of the run
    pub fn selection(&self) -> &Selection {
        self.run.selection()
    }

    /// Fail the task, halting the run. Return the result from the body.
    pub fn abort(&self, message: impl Into<String>) -> anyhow::Error {
        GateError::TaskAborted {
            title: self.title.clone(),
            message: message.into(),
        }
        .into()
    }

    /// Abort in strict mode, otherwise warn and carry on
    pub fn abort_or_warn(&self, message: impl Into<String>) -> anyhow::Result<()> {
        let message = message.into();
        if self.strict_mode() {
            return Err(self.abort(message));
        }
        self.run.report(GateEvent::Warning { message });
        Ok(())
    }

    /// Log an informational message
    pub fn info(&self, message: impl Into<String>) {
        self.run.report(GateEvent::Info {
            message: message.into(),
        });
    }

    /// Add a line to the command transcript without running anything
    pub fn record_command(&mut self, line: impl Into<String>) {
        self.run.record_command(line);
    }

    /// Record `command_line` in the transcript and run it through `sh -c`
    pub fn run_command(&mut self, command_line: &str) -> anyhow::Result<()> {
        self.run.record_command(command_line);
        debug!(task = %self.title, command = command_line, "running");

        let status = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .current_dir(&self.run.options.workdir)
            .status()
            .map_err(|e| GateError::Command {
                command: command_line.to_string(),
                message: e.to_string(),
            })?;

        if !status.success() {
            return Err(GateError::Command {
                command: command_line.to_string(),
                message: format!("exited with code {}", status.code().unwrap_or(-1)),
            }
            .into());
        }
        Ok(())
    }

    /// Declare a nested task
    pub fn task<F>(&mut self, spec: TaskSpec, body: F) -> anyhow::Result<TaskState>
    where
        F: FnOnce(&mut TaskScope<'_>) -> anyhow::Result<()>,
    {
        self.run.task(spec, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::CollectingReporter;
    use crate::tags::TagSpec;

    fn run_with(selection: Selection, options: RunOptions) -> (GateRun, Arc<CollectingReporter>) {
        let reporter = Arc::new(CollectingReporter::default());
        (GateRun::new(selection, options, reporter.clone()), reporter)
    }

    #[test]
    fn test_selected_task_runs_body() {
        let (mut run, reporter) = run_with(Selection::All, RunOptions::default());
        let mut ran = false;
        let state = run
            .task(TaskSpec::new("Versions"), |_| {
                ran = true;
                Ok(())
            })
            .unwrap();

        assert!(ran);
        assert_eq!(state, TaskState::Stopped);
        assert_eq!(reporter.begun(), vec!["Versions".to_string()]);
        assert_eq!(run.records().len(), 1);
    }

    #[test]
    fn test_skipped_task_not_recorded() {
        let selection = Selection::tags(TagSpec::parse_list("style", false).unwrap(), false);
        let (mut run, _) = run_with(selection, RunOptions::default());
        let state = run
            .task(TaskSpec::new("Build").with_tags(["build"]), |_| {
                panic!("body of a skipped task must not run")
            })
            .unwrap();

        assert_eq!(state, TaskState::Skipped);
        assert!(run.records().is_empty());
        assert_eq!(run.declared().len(), 1);
    }

    #[test]
    fn test_dry_run_records_without_running() {
        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        let (mut run, reporter) = run_with(Selection::All, options);
        let state = run
            .task(TaskSpec::new("Build"), |_| panic!("dry run must not run bodies"))
            .unwrap();

        assert_eq!(state, TaskState::Stopped);
        assert_eq!(run.records().len(), 1);
        assert_eq!(reporter.begun(), vec!["Build".to_string()]);
    }

    #[test]
    fn test_body_sees_running_state() {
        let (mut run, _) = run_with(Selection::All, RunOptions::default());
        let mut seen = None;
        let state = run
            .task(TaskSpec::new("Versions"), |t| {
                seen = Some(t.state());
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, Some(TaskState::Running));
        assert_eq!(state, TaskState::Stopped);

        let (mut run, _) = run_with(
            Selection::StartAt("Later".to_string()),
            RunOptions::default(),
        );
        let state = run
            .task(TaskSpec::new("Versions"), |_| panic!("skipped tasks never run"))
            .unwrap();
        assert_eq!(state, TaskState::Skipped);
    }

    #[test]
    fn test_duplicate_title_rejected() {
        let (mut run, _) = run_with(Selection::All, RunOptions::default());
        run.task(TaskSpec::new("Build"), |_| Ok(())).unwrap();
        let err = run.task(TaskSpec::new("Build"), |_| Ok(())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Gate task with title \"Build\" is already defined"
        );
    }

    #[test]
    fn test_abort_logs_and_propagates() {
        let (mut run, reporter) = run_with(Selection::All, RunOptions::default());
        let err = run
            .task(TaskSpec::new("Overlap"), |t| Err(t.abort("Found overlapping distributions.")))
            .unwrap_err();

        assert!(err.to_string().contains("Found overlapping distributions."));
        assert_eq!(run.records()[0].state, TaskState::Aborted);
        assert!(reporter
            .events()
            .iter()
            .any(|e| matches!(e, GateEvent::Abort { title, .. } if title == "Overlap")));
    }

    #[test]
    fn test_abort_or_warn_follows_strict_mode() {
        let (mut lenient, reporter) = run_with(Selection::All, RunOptions::default());
        lenient
            .task(TaskSpec::new("Pylint"), |t| t.abort_or_warn("Pylint not configured"))
            .unwrap();
        assert!(reporter
            .events()
            .iter()
            .any(|e| matches!(e, GateEvent::Warning { .. })));

        let strict = RunOptions {
            strict_mode: true,
            ..Default::default()
        };
        let (mut strict, _) = run_with(Selection::All, strict);
        assert!(strict
            .task(TaskSpec::new("Pylint"), |t| t.abort_or_warn("Pylint not configured"))
            .is_err());
    }

    #[test]
    fn test_run_command_records_transcript() {
        let temp = tempfile::TempDir::new().unwrap();
        let options = RunOptions {
            workdir: temp.path().to_path_buf(),
            ..Default::default()
        };
        let (mut run, _) = run_with(Selection::All, options);
        run.task(TaskSpec::new("Touch"), |t| t.run_command("touch marker"))
            .unwrap();
        let err = run
            .task(TaskSpec::new("Fail"), |t| t.run_command("exit 4"))
            .unwrap_err();

        assert!(temp.path().join("marker").exists());
        assert!(err.to_string().contains("exited with code 4"));
        assert_eq!(run.commands(), ["touch marker", "exit 4"]);
    }

    #[test]
    fn test_nested_tasks_share_selection() {
        let (mut run, reporter) = run_with(Selection::All, RunOptions::default());
        run.task(TaskSpec::new("BuildWithEcj"), |t| {
            t.task(TaskSpec::new("CleanAfterEcjBuild"), |_| Ok(()))?;
            Ok(())
        })
        .unwrap();

        assert_eq!(
            reporter.begun(),
            vec!["BuildWithEcj".to_string(), "CleanAfterEcjBuild".to_string()]
        );
        // Inner tasks complete first
        assert_eq!(run.records()[0].title, "CleanAfterEcjBuild");
    }
}
