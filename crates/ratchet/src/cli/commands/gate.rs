//! Gate command: run the configured gate tasks

use std::sync::Arc;

use clap::{ArgGroup, Args};
use console::style;
use tracing::{debug, info};

use ratchet_build::{nodes_from_config, BuildGraph};
use ratchet_core::config::GateTaskConfig;
use ratchet_gate::{
    format_duration, Gate, GateArgs, GateEvent, GateReporter, PartialSpec, SummaryFormat,
    TaskScope, TaskSpec, TracingReporter,
};

use super::build::{build_options, build_reporter, check_results, run_graph, BuildSettings};
use super::Project;
use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Run the gate tasks
#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("select")
        .args(["task_filter", "strict_task_filter", "start_at", "tags"])
))]
pub struct GateCommand {
    /// Only run tasks whose title contains one of these (comma separated)
    #[arg(short = 't', long)]
    pub task_filter: Option<String>,

    /// Only run tasks with exactly these titles (comma separated)
    #[arg(short = 'T', long)]
    pub strict_task_filter: Option<String>,

    /// Skip tasks until the first one whose title contains this
    #[arg(short = 's', long)]
    pub start_at: Option<String>,

    /// Only run tasks with these tags, `name[:from[:to]]` (comma separated)
    #[arg(long)]
    pub tags: Option<String>,

    /// Exclude the tasks selected by the filter or tags instead
    #[arg(short = 'x', long)]
    pub exclude: bool,

    /// Run one shard of the selected tasks, `i/n`
    #[arg(short = 'p', long, value_parser = PartialSpec::parse)]
    pub partial: Option<PartialSpec>,

    /// List what would run without running it
    #[arg(long)]
    pub dry_run: bool,

    /// Print a task summary table at the end
    #[arg(long)]
    pub summary: bool,

    /// Columns of the summary table (duration,title,description,tags)
    #[arg(long, value_parser = parse_summary_format)]
    pub summary_format: Option<SummaryFormat>,

    /// Abort when a task cannot run instead of warning
    #[arg(long)]
    pub strict_mode: bool,
}

fn parse_summary_format(s: &str) -> Result<SummaryFormat, ratchet_gate::GateError> {
    s.parse()
}

impl GateCommand {
    /// Execute the gate command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(dry_run = self.dry_run, partial = ?self.partial, "executing gate command");
        let project = Arc::new(Project::current()?);

        let args = self.gate_args(&project, cli);
        let reporter: Arc<dyn GateReporter> = if cli.shows_progress() {
            Arc::new(ConsoleReporter::new(cli.verbose))
        } else {
            Arc::new(TracingReporter)
        };

        let gate = configured_gate(project.clone(), cli, reporter);
        let report = gate.run(&args)?;

        if cli.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Ok(())
    }

    fn gate_args(&self, project: &Project, cli: &Cli) -> GateArgs {
        let mut args = GateArgs::from_config(&project.config.gate);
        args.task_filter = self.task_filter.clone();
        args.strict_task_filter = self.strict_task_filter.clone();
        args.start_at = self.start_at.clone();
        args.tags = self.tags.clone();
        args.exclude = self.exclude;
        args.partial = self.partial;
        args.dry_run = self.dry_run;
        args.summary = match (&self.summary_format, self.summary) {
            (Some(format), _) => Some(format.clone()),
            (None, true) => Some(SummaryFormat::default()),
            (None, false) => None,
        };
        args.strict_mode |= self.strict_mode;
        args.verbose = cli.verbose;
        args.reproduce = std::env::args().collect::<Vec<_>>().join(" ");
        args.workdir = project.root.clone();
        args
    }
}

/// A gate with one runner declaring every `[[gate.tasks]]` entry
fn configured_gate(project: Arc<Project>, cli: &Cli, reporter: Arc<dyn GateReporter>) -> Gate {
    let settings = BuildSettings::from_cli(cli);

    let mut gate = Gate::new(reporter);
    gate.add_runner("config", move |_, run| {
        for task in &project.config.gate.tasks {
            run.task(task_spec(task), |scope| {
                run_configured_task(scope, task, &project, settings)
            })?;
        }
        Ok(())
    });
    gate
}

fn task_spec(task: &GateTaskConfig) -> TaskSpec {
    let spec = TaskSpec::new(task.title.clone())
        .with_tags(task.tags.iter().cloned())
        .with_legacy_titles(task.legacy_titles.iter().cloned());
    match &task.description {
        Some(description) => spec.with_description(description.clone()),
        None => spec,
    }
}

fn run_configured_task(
    scope: &mut TaskScope<'_>,
    task: &GateTaskConfig,
    project: &Project,
    settings: BuildSettings,
) -> anyhow::Result<()> {
    if let Some(missing) = task
        .requires_env
        .iter()
        .find(|var| std::env::var_os(var.as_str()).is_none())
    {
        return scope.abort_or_warn(format!(
            "Skipping {}: environment variable {} is not set",
            task.title, missing
        ));
    }

    if task.build {
        scope.record_command("ratchet build");
        run_build(project, settings).map_err(|e| scope.abort(format!("{:#}", e)))?;
    }

    if let Some(command) = &task.command {
        scope.run_command(command)?;
    }
    Ok(())
}

fn run_build(project: &Project, settings: BuildSettings) -> anyhow::Result<()> {
    let options = build_options(project, settings);
    let reporter = build_reporter(settings, options.print_timing);
    let graph = BuildGraph::build(
        nodes_from_config(&project.config, &project.root),
        Arc::new(options),
        reporter.clone(),
    )?;
    debug!(subjects = graph.len(), "building from gate task");
    let results = run_graph(&graph, project.config.build.parallelism, reporter)?;
    check_results(&results)
}

/// Console reporter printing the gate log
struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl GateReporter for ConsoleReporter {
    fn report(&self, event: &GateEvent) {
        match event {
            GateEvent::Begin { stamp, title } => {
                println!("{}{}", style(stamp).dim(), style(title).bold());
            }
            GateEvent::End {
                stamp,
                title,
                duration,
            } => {
                println!(
                    "{}{} {}",
                    style(stamp).dim(),
                    style(title).green(),
                    style(format!("[{}]", format_duration(*duration))).dim()
                );
            }
            GateEvent::Abort {
                stamp,
                title,
                duration,
            } => {
                println!(
                    "{}{} {}",
                    style(stamp).red(),
                    style(title).red().bold(),
                    style(format!("[{}]", format_duration(*duration))).dim()
                );
            }
            GateEvent::Skipped { title } => {
                if self.verbose {
                    println!("  {} {}", style("○").yellow(), style(title).dim());
                }
            }
            GateEvent::Command { line } => {
                if self.verbose {
                    println!("  {} {}", style("$").dim(), line);
                }
            }
            GateEvent::Warning { message } => output::warning(message),
            GateEvent::Info { message } => output::info(message),
            GateEvent::Transcript {
                commands,
                reproduce,
            } => {
                eprintln!();
                eprintln!("The sequence of commands that were executed until the failure follows:");
                for command in commands {
                    eprintln!("{}", command);
                }
                eprintln!(
                    "If the previous sequence is incomplete or some commands were executed programmatically use:"
                );
                eprintln!("{}", style(reproduce).cyan());
                eprintln!();
            }
            GateEvent::Summary { lines } => {
                for line in lines {
                    println!("{}", line);
                }
            }
        }
    }
}
