//! Gate task declarations and their lifecycle

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Declaration of a gate task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSpec {
    /// Unique title within a run
    pub title: String,
    /// Historical titles still matched by filters
    pub legacy_titles: Vec<String>,
    /// Category labels
    pub tags: Vec<String>,
    /// Human readable description
    pub description: Option<String>,
}

impl TaskSpec {
    /// Create a task declaration
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the legacy titles
    pub fn with_legacy_titles<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.legacy_titles = titles.into_iter().map(Into::into).collect();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the task carries `tag`
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Lifecycle of a gate task.
///
/// `Pending -> Skipped | Active`, then `Active -> Running -> Stopped | Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Selection not evaluated yet
    Pending,
    /// Not selected in this run
    Skipped,
    /// Selected, body not entered
    Active,
    /// Body executing
    Running,
    /// Finished normally
    Stopped,
    /// Failed and halted the run
    Aborted,
}

impl TaskState {
    /// Whether `next` is a legal successor
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, Skipped)
                | (Pending, Active)
                | (Active, Running)
                | (Active, Stopped)
                | (Running, Stopped)
                | (Running, Aborted)
        )
    }

    /// Move to `next`, which must be a legal successor
    pub fn advance(&mut self, next: TaskState) {
        debug_assert!(
            self.can_transition_to(next),
            "illegal task transition {} -> {}",
            self,
            next
        );
        *self = next;
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Skipped => "skipped",
            Self::Active => "active",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// A task that was selected in a run, with its timing
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    /// Task title
    pub title: String,
    /// Historical titles
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub legacy_titles: Vec<String>,
    /// Task tags
    pub tags: Vec<String>,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Final state
    pub state: TaskState,
    /// Time spent between BEGIN and END or ABORT
    pub duration: Duration,
}

impl TaskRecord {
    pub(crate) fn new(spec: TaskSpec, state: TaskState, duration: Duration) -> Self {
        Self {
            title: spec.title,
            legacy_titles: spec.legacy_titles,
            tags: spec.tags,
            description: spec.description,
            state,
            duration,
        }
    }

    /// Whether the title or a legacy title satisfies `pred`
    pub fn any_title(&self, mut pred: impl FnMut(&str) -> bool) -> bool {
        pred(&self.title) || self.legacy_titles.iter().any(|t| pred(t.as_str()))
    }
}

impl fmt::Display for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task: {}", self.title)
    }
}
