//! Ratchet Build - Incremental build decision engine
//!
//! This crate decides, for a graph of interdependent build subjects, which
//! ones need rebuilding, executes the rebuilds in dependency order across a
//! bounded worker pool, and persists the dependency snapshots used to detect
//! graph changes between invocations.

pub mod dag;
pub mod error;
pub mod kind;
pub mod kinds;
pub mod options;
pub mod reporter;
pub mod saved_deps;
pub mod scheduler;
pub mod stamp;
pub mod subject;
pub mod task;

#[cfg(test)]
mod testing;

pub use dag::{BuildGraph, BuildNode, GraphError};
pub use error::BuildError;
pub use kind::{BuildContext, BuildOutcome, Decision, TaskKind};
pub use kinds::{node_from_config, nodes_from_config, CommandTask, LibraryTask};
pub use options::BuildOptions;
pub use reporter::{BuildEvent, BuildReporter, CollectingReporter, TracingReporter};
pub use saved_deps::{safe_create, SavedDeps};
pub use scheduler::{BuildResult, BuildScheduler, BuildStatus, SchedulerOptions};
pub use stamp::OutputStamp;
pub use subject::{Subject, SubjectKind};
pub use task::{BuildState, BuildTask, BuiltCell};
