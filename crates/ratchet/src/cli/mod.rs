//! CLI definition and command handling

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use commands::{BuildCommand, CleanCommand, GateCommand, InitCommand};

/// Ratchet - Incremental build engine and gate task harness
#[derive(Debug, Parser)]
#[command(name = "ratchet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize a new Ratchet configuration
    Init(InitCommand),

    /// Build every configured subject that is out of date
    Build(BuildCommand),

    /// Remove the artifacts of every configured subject
    Clean(CleanCommand),

    /// Run the gate tasks
    Gate(GateCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Init(ref cmd) => cmd.execute(&self),
            Commands::Build(ref cmd) => cmd.execute(&self),
            Commands::Clean(ref cmd) => cmd.execute(&self),
            Commands::Gate(ref cmd) => cmd.execute(&self),
        }
    }

    /// Whether human readable progress should be printed
    pub fn shows_progress(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gate_arguments() {
        let cli = Cli::parse_from([
            "ratchet", "-v", "gate", "--tags", "build,style", "-x", "--dry-run",
        ]);
        assert!(cli.verbose);
        assert!(cli.shows_progress());
        match cli.command {
            Commands::Gate(cmd) => {
                assert_eq!(cmd.tags.as_deref(), Some("build,style"));
                assert!(cmd.exclude);
                assert!(cmd.dry_run);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_selection_options_conflict() {
        let result = Cli::try_parse_from(["ratchet", "gate", "-t", "Pylint", "--tags", "style"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_is_validated() {
        assert!(Cli::try_parse_from(["ratchet", "gate", "-p", "4/3"]).is_err());
        let cli = Cli::try_parse_from(["ratchet", "gate", "-p", "2/3"]).unwrap();
        match cli.command {
            Commands::Gate(cmd) => assert_eq!(cmd.partial.map(|p| p.to_string()).as_deref(), Some("2/3")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_build_arguments() {
        let cli = Cli::parse_from([
            "ratchet", "--format", "json", "build", "--only", "core,app", "-s", "-j", "2",
        ]);
        assert!(!cli.shows_progress());
        match cli.command {
            Commands::Build(cmd) => {
                assert_eq!(cmd.only.as_deref(), Some("core,app"));
                assert!(cmd.shallow_dependency_checks);
                assert_eq!(cmd.jobs, Some(2));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
