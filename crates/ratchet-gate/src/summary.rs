//! End-of-run summaries

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{GateError, Result};
use crate::task::TaskRecord;
use crate::timing::format_duration;

/// A column of the `--summary` table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryField {
    Duration,
    Title,
    Description,
    Tags,
}

impl SummaryField {
    const ALL: [SummaryField; 4] = [Self::Duration, Self::Title, Self::Description, Self::Tags];

    fn name(self) -> &'static str {
        match self {
            Self::Duration => "duration",
            Self::Title => "title",
            Self::Description => "description",
            Self::Tags => "tags",
        }
    }

    fn value(self, task: &TaskRecord) -> String {
        match self {
            Self::Duration => format_duration(task.duration),
            Self::Title => task.title.clone(),
            Self::Description => task.description.clone().unwrap_or_default(),
            Self::Tags if task.tags.is_empty() => String::new(),
            Self::Tags => format!("[{}]", task.tags.join(", ")),
        }
    }
}

impl FromStr for SummaryField {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| GateError::UnknownSummaryEntry {
                entry: s.to_string(),
                known: Self::ALL.map(Self::name).join(", "),
            })
    }
}

/// Columns of the `--summary` table, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryFormat(Vec<SummaryField>);

impl Default for SummaryFormat {
    fn default() -> Self {
        Self(SummaryField::ALL.to_vec())
    }
}

impl FromStr for SummaryFormat {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        s.split(',')
            .map(|f| f.trim().parse())
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

impl fmt::Display for SummaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|c| c.name()).collect();
        f.write_str(&names.join(","))
    }
}

impl SummaryFormat {
    /// Render the summary table. Dry runs have no meaningful durations.
    pub fn render(&self, tasks: &[TaskRecord], dry_run: bool) -> Vec<String> {
        let fields: Vec<SummaryField> = self
            .0
            .iter()
            .copied()
            .filter(|f| !(dry_run && *f == SummaryField::Duration))
            .collect();

        let rows: Vec<Vec<String>> = tasks
            .iter()
            .map(|t| fields.iter().map(|f| f.value(t)).collect())
            .collect();
        let widths: Vec<usize> = (0..fields.len())
            .map(|i| rows.iter().map(|r| r[i].chars().count()).max().unwrap_or(0))
            .collect();

        let mut lines = vec!["Gate task summary:".to_string()];
        for row in rows {
            let mut line = String::from("  ");
            for (value, width) in row.iter().zip(&widths) {
                line.push_str(&format!("  {:<width$}", value, width = *width));
            }
            lines.push(line.trim_end().to_string());
        }
        lines
    }
}

/// Default end-of-run table: one line per task and the total
pub fn render_times(tasks: &[TaskRecord], total: Duration, verbose: bool) -> Vec<String> {
    let mut lines = vec!["Gate task times:".to_string()];
    for task in tasks {
        let tags = if verbose && !task.tags.is_empty() {
            format!(" [{}]", task.tags.join(","))
        } else {
            String::new()
        };
        lines.push(format!(
            "  {}\t{}{}",
            format_duration(task.duration),
            task.title,
            tags
        ));
    }
    lines.push("  =======".to_string());
    lines.push(format!("  {}", format_duration(total)));
    lines
}
