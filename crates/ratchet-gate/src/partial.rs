//! Sharded (partial) gate runs

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{GateError, Result};
use crate::tags::Tags;
use crate::task::TaskRecord;

/// `i/n`: run the `i`th of `n` shards, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartialSpec {
    index: usize,
    total: usize,
}

impl PartialSpec {
    /// Select shard `selected` (1-based) of `total`
    pub fn new(selected: usize, total: usize) -> Result<Self> {
        if selected == 0 || selected > total {
            return Err(GateError::PartialOutOfBounds(format!("{}/{}", selected, total)));
        }
        Ok(Self {
            index: selected - 1,
            total,
        })
    }

    /// Parse `i/n`
    pub fn parse(arg: &str) -> Result<Self> {
        let invalid = || GateError::InvalidPartial(arg.to_string());
        let (selected, total) = arg.split_once('/').ok_or_else(invalid)?;
        let selected = selected.trim().parse::<usize>().map_err(|_| invalid())?;
        let total = total.trim().parse::<usize>().map_err(|_| invalid())?;
        Self::new(selected, total).map_err(|_| GateError::PartialOutOfBounds(arg.to_string()))
    }

    /// Selected shard, 1-based
    pub fn selected(&self) -> usize {
        self.index + 1
    }

    /// Number of shards
    pub fn total(&self) -> usize {
        self.total
    }
}

impl FromStr for PartialSpec {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PartialSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.selected(), self.total)
    }
}

/// Tasks one shard must run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardPlan {
    /// Tasks tagged `always` or `build`, run by every shard
    pub always: Vec<String>,
    /// This shard's round-robin slice of the remaining tasks
    pub partial: Vec<String>,
    /// Number of tasks not tagged `always` or `build`
    pub non_always_total: usize,
}

impl ShardPlan {
    /// Titles to select in the real run
    pub fn titles(&self) -> Vec<String> {
        self.always.iter().chain(&self.partial).cloned().collect()
    }
}

/// Split the tasks of a planning run into the ones shard `spec` runs
pub fn plan_shard(planned: &[TaskRecord], spec: &PartialSpec) -> ShardPlan {
    let (always, rest): (Vec<&TaskRecord>, Vec<&TaskRecord>) = planned
        .iter()
        .partition(|t| t.tags.iter().any(|tag| Tags::SHARD_INVARIANT.contains(&tag.as_str())));

    let partial = rest
        .iter()
        .skip(spec.index)
        .step_by(spec.total)
        .map(|t| t.title.clone())
        .collect();

    ShardPlan {
        always: always.iter().map(|t| t.title.clone()).collect(),
        partial,
        non_always_total: rest.len(),
    }
}
