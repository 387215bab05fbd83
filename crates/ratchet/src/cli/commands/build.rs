//! Build command: bring every configured subject up to date

use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::info;

use ratchet_build::options::shallow_dependency_checks;
use ratchet_build::{
    nodes_from_config, BuildEvent, BuildGraph, BuildOptions, BuildOutcome, BuildReporter,
    BuildResult, BuildScheduler, BuildStatus, SchedulerOptions, TracingReporter,
};

use super::Project;
use crate::cli::output::{minutes_seconds, plural, time_prefix};
use crate::cli::{Cli, OutputFormat};

/// Build every configured subject that is out of date
#[derive(Debug, Args)]
pub struct BuildCommand {
    /// Clean every subject before building it
    #[arg(long)]
    pub clean: bool,

    /// Rebuild regardless of staleness
    #[arg(long)]
    pub force: bool,

    /// Only build these subjects (comma separated)
    #[arg(long)]
    pub only: Option<String>,

    /// Ignore dependency outputs when checking non-native subjects
    #[arg(short = 's', long)]
    pub shallow_dependency_checks: bool,

    /// Prefix log lines with the time and report build durations
    #[arg(long)]
    pub print_timing: bool,

    /// Maximum concurrent builds
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Show the execution plan without building
    #[arg(long)]
    pub dry_run: bool,
}

impl BuildCommand {
    /// Execute the build command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(clean = self.clean, force = self.force, "executing build command");
        let project = Project::current()?;

        let settings = BuildSettings::from_cli(cli);
        let mut options = build_options(&project, settings);
        options.clean = self.clean;
        options.force = self.force;
        options.print_timing |= self.print_timing;
        options.shallow_dependency_checks = shallow_dependency_checks(
            self.shallow_dependency_checks.then_some(true),
            project.config.build.shallow_dependency_checks,
        );
        let options = options.with_only(self.only.as_deref());

        let reporter = build_reporter(settings, options.print_timing);
        let graph = BuildGraph::build(
            nodes_from_config(&project.config, &project.root),
            Arc::new(options),
            reporter.clone(),
        )?;

        if graph.is_empty() {
            if cli.shows_progress() {
                println!("{} No subjects configured.", style("✓").green());
            }
            return Ok(());
        }

        if self.dry_run {
            return print_plan(&graph, cli);
        }

        let parallelism = self.jobs.unwrap_or(project.config.build.parallelism);
        let results = run_graph(&graph, parallelism, reporter)?;

        if cli.format == OutputFormat::Json {
            print_results(&results)?;
        }
        check_results(&results)
    }
}

/// Global flags that shape a build
#[derive(Debug, Clone, Copy)]
pub(crate) struct BuildSettings {
    pub verbose: bool,
    pub progress: bool,
}

impl BuildSettings {
    pub(crate) fn from_cli(cli: &Cli) -> Self {
        Self {
            verbose: cli.verbose,
            progress: cli.shows_progress(),
        }
    }
}

/// Build options from the project configuration and the global flags
pub(crate) fn build_options(project: &Project, settings: BuildSettings) -> BuildOptions {
    let mut options = BuildOptions::from_config(&project.config.build);
    options.output_dir = project.resolve(&project.config.build.output_dir);
    options.verbose = settings.verbose;
    options
}

/// Console reporter for interactive runs, tracing otherwise
pub(crate) fn build_reporter(settings: BuildSettings, print_timing: bool) -> Arc<dyn BuildReporter> {
    if settings.progress {
        Arc::new(ConsoleReporter::new(settings.verbose, print_timing))
    } else {
        Arc::new(TracingReporter)
    }
}

/// Execute the graph on a fresh runtime
pub(crate) fn run_graph(
    graph: &BuildGraph,
    parallelism: usize,
    reporter: Arc<dyn BuildReporter>,
) -> anyhow::Result<Vec<BuildResult>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let scheduler = BuildScheduler::new(SchedulerOptions { parallelism }, reporter);
    Ok(runtime.block_on(scheduler.execute(graph)))
}

/// Fail when any build failed
pub(crate) fn check_results(results: &[BuildResult]) -> anyhow::Result<()> {
    let failures: Vec<String> = results
        .iter()
        .filter_map(|r| match &r.status {
            BuildStatus::Failed(msg) => Some(format!("{}: {}", r.subject, msg)),
            _ => None,
        })
        .collect();
    if !failures.is_empty() {
        anyhow::bail!(
            "{} build{} failed:\n  {}",
            failures.len(),
            plural(failures.len()),
            failures.join("\n  ")
        );
    }
    Ok(())
}

fn print_plan(graph: &BuildGraph, cli: &Cli) -> anyhow::Result<()> {
    if cli.format == OutputFormat::Json {
        let plan: Vec<serde_json::Value> = graph
            .waves()
            .enumerate()
            .map(|(i, wave)| {
                serde_json::json!({
                    "wave": i,
                    "subjects": wave.iter().map(|t| t.name().to_string()).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else if !cli.quiet {
        println!("{}", graph.execution_plan());
        println!("{}", style("[DRY RUN - nothing will be built]").yellow().bold());
    }
    Ok(())
}

fn print_results(results: &[BuildResult]) -> anyhow::Result<()> {
    let summary = serde_json::json!({
        "total": results.len(),
        "rebuilt": results.iter().filter(|r| r.status == BuildStatus::Rebuilt).count(),
        "failed": results.iter().filter(|r| r.status.is_failure()).count(),
        "subjects": results.iter().map(|r| {
            let (status, detail) = match &r.status {
                BuildStatus::Rebuilt => ("rebuilt", None),
                BuildStatus::UpToDate => ("up_to_date", None),
                BuildStatus::Skipped(reason) => ("skipped", Some(reason)),
                BuildStatus::Failed(error) => ("failed", Some(error)),
            };
            serde_json::json!({
                "subject": r.subject,
                "status": status,
                "detail": detail,
                "duration_ms": r.duration.as_millis(),
            })
        }).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Console reporter with live output
pub(crate) struct ConsoleReporter {
    verbose: bool,
    print_timing: bool,
}

impl ConsoleReporter {
    pub(crate) fn new(verbose: bool, print_timing: bool) -> Self {
        Self {
            verbose,
            print_timing,
        }
    }

    fn prefix(&self) -> String {
        if self.print_timing {
            time_prefix()
        } else {
            String::new()
        }
    }
}

impl BuildReporter for ConsoleReporter {
    fn report(&self, event: &BuildEvent) {
        match event {
            BuildEvent::Cleaning { subject } => {
                println!("{}Cleaning {}...", self.prefix(), style(subject).bold());
            }
            BuildEvent::Started { task, reason, .. } => {
                println!(
                    "{}{}... {}",
                    self.prefix(),
                    style(task).bold(),
                    style(format!("[{}]", reason)).dim()
                );
            }
            BuildEvent::Output {
                subject,
                line,
                is_stderr,
            } => {
                if self.verbose {
                    if *is_stderr {
                        println!("    {} {}", style(format!("[{}]", subject)).red().dim(), line);
                    } else {
                        println!("    {} {}", style(format!("[{}]", subject)).dim(), line);
                    }
                }
            }
            BuildEvent::Completed {
                task,
                duration,
                outcome,
                ..
            } => {
                let note = match outcome {
                    BuildOutcome::Rebuilt => String::new(),
                    BuildOutcome::UpToDate => format!(" {}", style("(nothing to do)").cyan()),
                };
                if self.print_timing {
                    println!(
                        "{}{}{} [duration: {}]",
                        self.prefix(),
                        style(task).green(),
                        note,
                        minutes_seconds(*duration)
                    );
                } else if self.verbose {
                    println!(
                        "  {} {}{} {}",
                        style("✓").green(),
                        style(task).green(),
                        note,
                        style(format!("{:.1}s", duration.as_secs_f64())).dim()
                    );
                }
            }
            BuildEvent::Failed { task, error, .. } => {
                println!(
                    "{}{} {}: {}",
                    self.prefix(),
                    style("✗").red(),
                    style(task).red(),
                    style(error).red().dim()
                );
            }
            BuildEvent::Skipped { subject, reason } => {
                if self.verbose {
                    let line = match reason {
                        Some(reason) => format!("[{} - skipping {}]", reason, subject),
                        None => format!("[skipping {}]", subject),
                    };
                    println!("{}{}", self.prefix(), style(line).dim());
                }
            }
            BuildEvent::WaveStarted { wave, task_count } => {
                if self.verbose {
                    println!(
                        "  {} Wave {} ({} subject{})",
                        style("─").dim(),
                        wave,
                        task_count,
                        plural(*task_count)
                    );
                }
            }
            BuildEvent::AllCompleted {
                total,
                rebuilt,
                up_to_date,
                failed,
                duration,
            } => {
                println!(
                    "{}{} {} rebuilt, {} up to date, {} failed of {} ({:.1}s)",
                    self.prefix(),
                    if *failed == 0 {
                        style("✓").green().bold()
                    } else {
                        style("✗").red().bold()
                    },
                    rebuilt,
                    up_to_date,
                    failed,
                    total,
                    duration.as_secs_f64()
                );
            }
        }
    }
}
