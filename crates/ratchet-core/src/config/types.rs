//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for Ratchet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Version of the config schema
    #[serde(rename = "$schema")]
    pub schema: Option<String>,

    /// Project name
    pub name: Option<String>,

    /// Build engine configuration
    pub build: BuildConfig,

    /// Buildable subjects, in declaration order
    #[serde(default)]
    pub subjects: Vec<SubjectConfig>,

    /// Gate configuration
    pub gate: GateConfig,
}

impl Config {
    /// Look up a subject by name
    pub fn subject(&self, name: &str) -> Option<&SubjectConfig> {
        self.subjects.iter().find(|s| s.name == name)
    }
}

/// Build engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory holding persisted build state (saved dependency snapshots)
    pub output_dir: PathBuf,

    /// Maximum number of build tasks executed concurrently
    pub parallelism: usize,

    /// Ignore the newest dependency output for non-native subjects
    pub shallow_dependency_checks: bool,

    /// Prefix build log lines with a wall-clock timestamp
    pub print_timing: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(".ratchet"),
            parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            shallow_dependency_checks: false,
            print_timing: false,
        }
    }
}

/// Kind of a buildable subject
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubjectKindConfig {
    /// Prebuilt artifact that is only checked for presence
    Library,
    /// Project built by a command
    #[default]
    Project,
    /// Native project built by a command (never subject to shallow checks)
    NativeProject,
    /// Distribution assembled from other subjects
    Distribution,
}

impl SubjectKindConfig {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Library => "library",
            Self::Project => "project",
            Self::NativeProject => "native-project",
            Self::Distribution => "distribution",
        }
    }
}

/// A buildable subject declaration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectConfig {
    /// Unique subject name
    pub name: String,

    /// Subject kind
    pub kind: SubjectKindConfig,

    /// Subjects this one depends on, in order
    #[serde(default)]
    pub deps: Vec<String>,

    /// Shell command building the subject
    pub command: Option<String>,

    /// Shell command cleaning the subject's outputs
    pub clean_command: Option<String>,

    /// Input glob patterns
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Output paths produced by the build command
    #[serde(default)]
    pub outputs: Vec<PathBuf>,

    /// Location of a prebuilt library file
    pub path: Option<PathBuf>,
}

/// Gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Abort instead of warning when a task cannot run for lack of tooling
    pub strict_mode: bool,

    /// Require every selected tag or filter to match at least one task
    pub strict_selection: bool,

    /// Gate tasks, in execution order
    #[serde(default)]
    pub tasks: Vec<GateTaskConfig>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            strict_selection: true,
            tasks: Vec::new(),
        }
    }
}

/// A gate task declaration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GateTaskConfig {
    /// Unique task title
    pub title: String,

    /// Historical titles still matched by filters
    #[serde(default)]
    pub legacy_titles: Vec<String>,

    /// Task tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Human readable description
    pub description: Option<String>,

    /// Shell command run as the task body
    pub command: Option<String>,

    /// Environment variables the task needs; missing ones are a soft failure
    #[serde(default)]
    pub requires_env: Vec<String>,

    /// Run the build engine over all configured subjects
    pub build: bool,
}
