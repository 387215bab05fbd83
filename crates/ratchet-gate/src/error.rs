//! Gate harness errors

use thiserror::Error;

/// Hint appended to selection errors
const LIST_TASKS_HINT: &str =
    "Run the following command to see all available tasks and their tags:\n  ratchet -v gate --dry-run";

/// Errors raised by the gate harness
#[derive(Debug, Error)]
pub enum GateError {
    /// Malformed `--tags` entry
    #[error("--tags option requires the format `name[:from[:to]]`: {0}")]
    InvalidTagSpec(String),

    /// Tag range combined with exclusion
    #[error("-x option cannot be used with tag ranges: {0}")]
    ExcludedTagRange(String),

    /// Empty or inverted tag range
    #[error("`from` must be less than `to` for tag ranges: {0}")]
    InvalidTagRange(String),

    /// Exclusion flag without anything to exclude
    #[error("-x option cannot be used without --task-filter, --strict-task-filter, or the --tags option")]
    ExcludeWithoutSelection,

    /// Malformed `--partial` value
    #[error("invalid partial argument specified: {0}")]
    InvalidPartial(String),

    /// `--partial` index outside `1..=total`
    #[error("out of bounds partial argument specified: {0}")]
    PartialOutOfBounds(String),

    /// Unknown `--summary-format` entry
    #[error("Unknown entry supplied to `--summary-format`: {entry}\nKnown entries are: {known}")]
    UnknownSummaryEntry { entry: String, known: String },

    /// Two tasks in one run share a title
    #[error("Gate task with title \"{0}\" is already defined")]
    DuplicateTitle(String),

    /// A selected tag matched no task
    #[error("Tag \"{0}\" not part of any task.\n{}", LIST_TASKS_HINT)]
    UnmatchedTag(String),

    /// A substring filter matched no task
    #[error("Filter \"{0}\" does not match any task.\n{}", LIST_TASKS_HINT)]
    UnmatchedFilter(String),

    /// A whole-title filter matched no task
    #[error("Strict filter \"{0}\" does not match any task.\n{}", LIST_TASKS_HINT)]
    UnmatchedStrictFilter(String),

    /// A task body aborted explicitly
    #[error("{title}: {message}")]
    TaskAborted { title: String, message: String },

    /// A recorded command failed
    #[error("command `{command}` failed: {message}")]
    Command { command: String, message: String },

    /// The run was aborted
    #[error("gate aborted: {0}")]
    Aborted(String),
}

impl GateError {
    /// Whether the error is an argument or gate definition problem rather than a task failure
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidTagSpec(_)
                | Self::ExcludedTagRange(_)
                | Self::InvalidTagRange(_)
                | Self::ExcludeWithoutSelection
                | Self::InvalidPartial(_)
                | Self::PartialOutOfBounds(_)
                | Self::UnknownSummaryEntry { .. }
                | Self::DuplicateTitle(_)
        )
    }
}

/// Result type for gate operations
pub type Result<T> = std::result::Result<T, GateError>;
