//! Ratchet Gate - Task selection and sequencing harness
//!
//! A gate is an ordered sequence of named, taggable tasks. Each run decides
//! once per task whether it is selected (by title substring, whole title,
//! start-at marker, tags with occurrence windows, or a shard of a partial
//! run), times the selected ones and aborts the whole run on the first
//! failure, printing the commands executed so far.

pub mod error;
pub mod gate;
pub mod partial;
pub mod reporter;
pub mod run;
pub mod selection;
pub mod summary;
pub mod tags;
pub mod task;
pub mod timing;

pub use error::{GateError, Result};
pub use gate::{check_strict_selection, Gate, GateArgs, GateReport, GateRunner};
pub use partial::{plan_shard, PartialSpec, ShardPlan};
pub use reporter::{CollectingReporter, GateEvent, GateReporter, TracingReporter};
pub use run::{GateRun, RunOptions, TaskScope};
pub use selection::{Selection, Selector};
pub use summary::{render_times, SummaryField, SummaryFormat};
pub use tags::{TagRange, TagSpec, Tags};
pub use task::{TaskRecord, TaskSpec, TaskState};
pub use timing::{format_duration, format_elapsed, timestamp};
