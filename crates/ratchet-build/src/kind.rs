//! Capability interface implemented by every concrete task kind

use crate::options::BuildOptions;
use crate::reporter::BuildReporter;
use crate::stamp::OutputStamp;
use crate::subject::Subject;

/// Everything a task kind may consult while deciding or building
pub struct BuildContext<'a> {
    /// The subject being built
    pub subject: &'a Subject,
    /// Run configuration
    pub options: &'a BuildOptions,
    /// Event sink for build output
    pub reporter: &'a dyn BuildReporter,
}

/// Staleness verdict of a task kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The subject must be rebuilt, with the reason
    Build(String),
    /// The subject is up to date, with the reason
    Skip(String),
}

impl Decision {
    /// Whether a build is needed
    pub fn is_build(&self) -> bool {
        matches!(self, Self::Build(_))
    }

    /// The reason attached to the verdict
    pub fn reason(&self) -> &str {
        match self {
            Self::Build(r) | Self::Skip(r) => r,
        }
    }
}

/// Result of a successful `build()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Artifacts were (re)produced; dependents must rebuild
    Rebuilt,
    /// The build step ran but found nothing to do
    UpToDate,
}

/// Artifact-specific behavior of a build task.
///
/// The engine owns the decision order (forbidden, clean, updated
/// dependencies, changed dependency list); kinds only answer the final
/// staleness question and perform the work.
pub trait TaskKind: Send + Sync {
    /// Short kind identifier, also used to partition saved dependency snapshots
    fn kind_name(&self) -> &'static str;

    /// Human readable description of the task, e.g. "Building core"
    fn describe(&self, subject: &Subject) -> String {
        format!("Building {}", subject.name)
    }

    /// The newest artifact produced by this task, if any exists
    fn newest_output(&self) -> Option<OutputStamp>;

    /// Whether the current artifacts are out of date.
    ///
    /// `newest_input` is the newest output among the task's dependencies.
    fn needs_build(
        &self,
        ctx: &BuildContext<'_>,
        newest_input: Option<&OutputStamp>,
    ) -> anyhow::Result<Decision>;

    /// Produce the artifacts
    fn build(&self, ctx: &BuildContext<'_>) -> anyhow::Result<BuildOutcome>;

    /// Remove the artifacts. `for_build` is set when cleaning right before a rebuild.
    fn clean(&self, ctx: &BuildContext<'_>, for_build: bool) -> anyhow::Result<()>;

    /// Whether building is forbidden for this run
    fn build_forbidden(&self, ctx: &BuildContext<'_>) -> bool {
        ctx.options.excludes(&ctx.subject.name)
    }

    /// Whether cleaning is forbidden for this run
    fn clean_forbidden(&self, _ctx: &BuildContext<'_>) -> bool {
        false
    }
}
