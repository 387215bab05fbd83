//! Init command

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use dialoguer::{Confirm, Select};
use tracing::info;

use ratchet_core::config::defaults::{
    DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_TOML, DEFAULT_CONFIG_YAML,
};
use ratchet_core::config::Config;

use crate::cli::output::path_style;
use crate::cli::Cli;

/// Initialize a new Ratchet configuration
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Use defaults without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force = self.force, yes = self.yes, "executing init command");
        let cwd = std::env::current_dir()?;

        let format = match &self.output {
            Some(path) if is_yaml(path) => "yaml",
            Some(_) => "toml",
            None if self.yes => "toml",
            None => {
                let formats = ["toml", "yaml"];
                let selection = Select::new()
                    .with_prompt("Configuration format")
                    .items(&formats)
                    .default(0)
                    .interact()?;
                formats[selection]
            }
        };

        let config_path = self.output.clone().unwrap_or_else(|| {
            cwd.join(if format == "yaml" {
                DEFAULT_CONFIG_YAML
            } else {
                DEFAULT_CONFIG_TOML
            })
        });

        // Check if config already exists
        if config_path.exists() && !self.force {
            if self.yes {
                anyhow::bail!(
                    "Configuration file already exists at {}. Use --force to overwrite.",
                    config_path.display()
                );
            }

            let overwrite = Confirm::new()
                .with_prompt(format!(
                    "Configuration file already exists at {}. Overwrite?",
                    config_path.display()
                ))
                .default(false)
                .interact()?;

            if !overwrite {
                println!("{}", style("Aborted.").yellow());
                return Ok(());
            }
        }

        std::fs::write(&config_path, render_template(format)?)?;

        if !cli.quiet {
            println!(
                "{} Created configuration at {}",
                style("✓").green().bold(),
                path_style().apply_to(config_path.display())
            );
            println!();
            println!("Next steps:");
            println!("  1. Declare your subjects and gate tasks in {}", config_path.display());
            println!("  2. Run {} to build them", style("ratchet build").cyan());
            println!("  3. Run {} to list the gate tasks", style("ratchet -v gate --dry-run").cyan());
        }

        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e == "yaml" || e == "yml")
}

/// The default configuration in the requested format
fn render_template(format: &str) -> anyhow::Result<String> {
    if format == "yaml" {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TEMPLATE)?;
        Ok(serde_yaml::to_string(&config)?)
    } else {
        Ok(DEFAULT_CONFIG_TEMPLATE.to_string())
    }
}
