//! Clean command: remove build artifacts

use std::sync::Arc;

use clap::Args;
use tracing::info;

use ratchet_build::{nodes_from_config, BuildGraph};

use super::build::{build_options, build_reporter, BuildSettings};
use super::Project;
use crate::cli::output::{self, plural};
use crate::cli::{Cli, OutputFormat};

/// Remove the artifacts of every configured subject
#[derive(Debug, Args)]
pub struct CleanCommand {
    /// Only clean these subjects (comma separated)
    #[arg(long)]
    pub only: Option<String>,
}

impl CleanCommand {
    /// Execute the clean command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(only = ?self.only, "executing clean command");
        let project = Project::current()?;
        let settings = BuildSettings::from_cli(cli);
        let options = build_options(&project, settings).with_only(self.only.as_deref());
        let reporter = build_reporter(settings, options.print_timing);
        let options = Arc::new(options);

        let graph = BuildGraph::build(
            nodes_from_config(&project.config, &project.root),
            options.clone(),
            reporter,
        )?;

        let mut cleaned = Vec::new();
        for task in graph.sorted().iter().rev() {
            if options.excludes(task.name()) {
                continue;
            }
            if task.clean()? {
                cleaned.push(task.name().to_string());
            }
        }

        if cli.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "cleaned": cleaned }))?);
        } else if !cli.quiet {
            output::success(&format!(
                "Cleaned {} subject{}",
                cleaned.len(),
                plural(cleaned.len())
            ));
        }
        Ok(())
    }
}
