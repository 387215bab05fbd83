//! Gate runner registry and the top-level gate run

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ratchet_core::config::GateConfig;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{GateError, Result};
use crate::partial::{plan_shard, PartialSpec, ShardPlan};
use crate::reporter::{GateEvent, GateReporter};
use crate::run::{GateRun, RunOptions};
use crate::selection::Selection;
use crate::summary::{render_times, SummaryFormat};
use crate::tags::TagSpec;
use crate::task::{TaskRecord, TaskSpec};

/// Title of the task spanning the whole run
const GATE_TITLE: &str = "Gate";

/// Gate command line options
#[derive(Debug, Clone)]
pub struct GateArgs {
    /// Comma separated title substrings
    pub task_filter: Option<String>,
    /// Comma separated whole titles
    pub strict_task_filter: Option<String>,
    /// Skip tasks until the first title containing this
    pub start_at: Option<String>,
    /// Comma separated `name[:from[:to]]` tag specs
    pub tags: Option<String>,
    /// Turn the filter or tag selection into an exclusion
    pub exclude: bool,
    /// Run one shard only
    pub partial: Option<PartialSpec>,
    /// Show what would run without running it
    pub dry_run: bool,
    /// Print a summary table instead of the task times
    pub summary: Option<SummaryFormat>,
    /// Abort on soft failures
    pub strict_mode: bool,
    /// Require every tag or filter to match a task
    pub strict_selection: bool,
    /// Include tags in the task times table
    pub verbose: bool,
    /// Command line reproducing this run, printed on failure
    pub reproduce: String,
    /// Working directory for task commands
    pub workdir: PathBuf,
}

impl Default for GateArgs {
    fn default() -> Self {
        Self {
            task_filter: None,
            strict_task_filter: None,
            start_at: None,
            tags: None,
            exclude: false,
            partial: None,
            dry_run: false,
            summary: None,
            strict_mode: false,
            strict_selection: false,
            verbose: false,
            reproduce: String::new(),
            workdir: PathBuf::from("."),
        }
    }
}

impl GateArgs {
    /// Defaults taken from the `[gate]` configuration section
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            strict_mode: config.strict_mode,
            strict_selection: config.strict_selection,
            ..Default::default()
        }
    }

    /// The selection policy these arguments describe.
    ///
    /// Start-at wins over filters, filters over strict filters, strict
    /// filters over tags.
    pub fn selection(&self) -> Result<Selection> {
        let split = |s: &str| s.split(',').map(String::from).collect::<Vec<_>>();

        if let Some(marker) = &self.start_at {
            return Ok(Selection::StartAt(marker.clone()));
        }
        if let Some(filters) = &self.task_filter {
            return Ok(Selection::Filters {
                substrings: split(filters),
                exclude: self.exclude,
            });
        }
        if let Some(names) = &self.strict_task_filter {
            return Ok(Selection::StrictFilters {
                names: split(names),
                exclude: self.exclude,
            });
        }
        if let Some(tags) = &self.tags {
            let specs = TagSpec::parse_list(tags, self.exclude)?;
            return Ok(Selection::tags(specs, self.exclude));
        }
        if self.exclude {
            return Err(GateError::ExcludeWithoutSelection);
        }
        Ok(Selection::All)
    }

    fn run_options(&self, dry_run: bool, log: bool) -> RunOptions {
        RunOptions {
            dry_run,
            log,
            strict_mode: self.strict_mode,
            workdir: self.workdir.clone(),
        }
    }
}

/// Outcome of a completed gate run
#[derive(Debug, Clone, Serialize)]
pub struct GateReport {
    /// Selected tasks, in completion order
    pub tasks: Vec<TaskRecord>,
    /// Wall-clock time of the whole run
    pub duration: Duration,
    /// Whether bodies were skipped
    pub dry_run: bool,
    /// Shard plan of a partial run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<ShardPlan>,
    /// A partial run found nothing to do for its shard
    pub finished_early: bool,
}

/// Registers a set of gate tasks. Called once per planning or real run.
pub type GateRunner = Box<dyn Fn(&GateArgs, &mut GateRun) -> anyhow::Result<()> + Send + Sync>;

/// Registry of gate runners and the entry point of a gate run
pub struct Gate {
    pre_runners: Vec<(String, GateRunner)>,
    runners: Vec<(String, GateRunner)>,
    reporter: Arc<dyn GateReporter>,
}

impl Gate {
    /// Create an empty gate
    pub fn new(reporter: Arc<dyn GateReporter>) -> Self {
        Self {
            pre_runners: Vec::new(),
            runners: Vec::new(),
            reporter,
        }
    }

    /// Add a runner executed after the ones registered before it
    pub fn add_runner<F>(&mut self, name: impl Into<String>, runner: F)
    where
        F: Fn(&GateArgs, &mut GateRun) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.runners.push((name.into(), Box::new(runner)));
    }

    /// Add a runner executed before every runner added with [`Gate::add_runner`]
    pub fn prepend_runner<F>(&mut self, name: impl Into<String>, runner: F)
    where
        F: Fn(&GateArgs, &mut GateRun) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.pre_runners.push((name.into(), Box::new(runner)));
    }

    /// Number of registered runners
    pub fn runner_count(&self) -> usize {
        self.pre_runners.len() + self.runners.len()
    }

    fn run_all(&self, args: &GateArgs, run: &mut GateRun) -> anyhow::Result<()> {
        for (name, runner) in self.pre_runners.iter().chain(&self.runners) {
            debug!(runner = %name, "running gate runner");
            runner(args, run)?;
        }
        Ok(())
    }

    /// Dry-run every runner with logging off to learn which tasks a real run selects
    fn plan(&self, args: &GateArgs, selection: Selection) -> anyhow::Result<Vec<TaskRecord>> {
        let mut run = GateRun::new(selection, args.run_options(true, false), self.reporter.clone());
        self.run_all(args, &mut run)?;
        Ok(run.into_records())
    }

    fn info(&self, message: String) {
        self.reporter.report(&GateEvent::Info { message });
    }

    /// Run the gate.
    ///
    /// Argument errors are returned before any task runs. Any failure during
    /// the run prints the command transcript, logs ABORT for the whole gate and
    /// returns [`GateError::Aborted`], except configuration errors such as a
    /// duplicate task title, which are returned as they are.
    #[instrument(skip_all, fields(runners = self.runner_count(), dry_run = args.dry_run))]
    pub fn run(&self, args: &GateArgs) -> Result<GateReport> {
        let mut selection = args.selection()?;
        let mut shard = None;

        if let Some(partial) = &args.partial {
            let planned = self.plan(args, selection).map_err(into_gate_error)?;
            let plan = plan_shard(&planned, partial);
            self.info(format!(
                "Running gate with partial tasks {}. {} out of {} non-build tasks selected.",
                partial,
                plan.partial.len(),
                plan.non_always_total
            ));
            if plan.partial.is_empty() {
                self.info("No partial tasks left to run. Finishing gate early.".to_string());
                return Ok(GateReport {
                    tasks: Vec::new(),
                    duration: Duration::ZERO,
                    dry_run: args.dry_run,
                    shard: Some(plan),
                    finished_early: true,
                });
            }
            selection = Selection::StrictFilters {
                names: plan.titles(),
                exclude: false,
            };
            shard = Some(plan);
        }

        let mut run = GateRun::new(
            selection,
            args.run_options(args.dry_run, true),
            self.reporter.clone(),
        );
        run.log_begin(GATE_TITLE);

        let result = self.run_all(args, &mut run).and_then(|()| {
            if args.strict_selection {
                check_strict_selection(run.selection(), run.records(), run.declared())?;
            }
            Ok(())
        });

        let duration = run.elapsed();
        if let Err(e) = result {
            self.reporter.report(&GateEvent::Transcript {
                commands: run.commands().to_vec(),
                reproduce: args.reproduce.clone(),
            });
            run.log_abort(GATE_TITLE, duration);
            return Err(into_gate_error(e));
        }
        run.log_end(GATE_TITLE, duration);

        let tasks = run.into_records();
        let lines = match &args.summary {
            Some(format) => format.render(&tasks, args.dry_run),
            None => render_times(&tasks, duration, args.verbose),
        };
        self.reporter.report(&GateEvent::Summary { lines });

        Ok(GateReport {
            tasks,
            duration,
            dry_run: args.dry_run,
            shard,
            finished_early: false,
        })
    }
}

/// Keep configuration errors intact, everything else aborts the gate
fn into_gate_error(e: anyhow::Error) -> GateError {
    match e.downcast::<GateError>() {
        Ok(err) if err.is_configuration() => err,
        Ok(err) => GateError::Aborted(format!("{:#}", anyhow::Error::from(err))),
        Err(e) => GateError::Aborted(format!("{:#}", e)),
    }
}

/// Every selected tag or filter must match at least one task.
///
/// Inclusive selections are checked against the tasks that ran, exclusions
/// against every declared task. The implicit `always` tag is exempt.
pub fn check_strict_selection(
    selection: &Selection,
    ran: &[TaskRecord],
    declared: &[TaskSpec],
) -> Result<()> {
    let declared_titles = |pred: &dyn Fn(&str) -> bool| {
        declared
            .iter()
            .any(|t| pred(&t.title) || t.legacy_titles.iter().any(|l| pred(l.as_str())))
    };
    let ran_titles = |pred: &dyn Fn(&str) -> bool| ran.iter().any(|t| t.any_title(pred));

    match selection {
        Selection::All | Selection::StartAt(_) => Ok(()),
        Selection::Tags { specs, exclude } => {
            for spec in specs {
                if spec.name == crate::tags::Tags::ALWAYS && !exclude {
                    continue;
                }
                let found = if *exclude {
                    declared.iter().any(|t| t.has_tag(&spec.name))
                } else {
                    ran.iter().any(|t| t.tags.contains(&spec.name))
                };
                if !found {
                    return Err(GateError::UnmatchedTag(spec.name.clone()));
                }
            }
            Ok(())
        }
        Selection::Filters {
            substrings,
            exclude,
        } => {
            for f in substrings {
                let pred = |t: &str| t.contains(f.as_str());
                let found = if *exclude {
                    declared_titles(&pred)
                } else {
                    ran_titles(&pred)
                };
                if !found {
                    return Err(GateError::UnmatchedFilter(f.clone()));
                }
            }
            Ok(())
        }
        Selection::StrictFilters { names, exclude } => {
            for f in names {
                let pred = |t: &str| t == f;
                let found = if *exclude {
                    declared_titles(&pred)
                } else {
                    ran_titles(&pred)
                };
                if !found {
                    return Err(GateError::UnmatchedStrictFilter(f.clone()));
                }
            }
            Ok(())
        }
    }
}
