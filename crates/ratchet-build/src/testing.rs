//! Test doubles for build task kinds

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::kind::{BuildContext, BuildOutcome, Decision, TaskKind};
use crate::stamp::OutputStamp;

/// Shared call counter
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records the newest input handed to `needs_build`
#[derive(Debug, Clone, Default)]
pub struct SeenInput(Arc<Mutex<Option<PathBuf>>>);

impl SeenInput {
    pub fn get_path(&self) -> Option<String> {
        self.0
            .lock()
            .unwrap()
            .as_ref()
            .map(|p| p.display().to_string())
    }
}

/// Task kind whose staleness verdict and build result are scripted
#[derive(Debug, Default)]
pub struct FakeKind {
    stale: bool,
    fail: bool,
    no_clean: bool,
    outcome: Option<BuildOutcome>,
    output: Option<OutputStamp>,
    pub builds: Counter,
    pub cleans: Counter,
    pub cleaned_for_build: Counter,
    pub seen_input: SeenInput,
}

impl FakeKind {
    /// Always reports itself out of date
    pub fn stale() -> Self {
        Self {
            stale: true,
            ..Default::default()
        }
    }

    /// Always reports itself up to date
    pub fn fresh() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn clean_forbidden(mut self) -> Self {
        self.no_clean = true;
        self
    }

    pub fn outcome(mut self, outcome: BuildOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn output(mut self, path: &str, modified: SystemTime) -> Self {
        self.output = Some(OutputStamp::new(path, modified));
        self
    }
}

impl TaskKind for FakeKind {
    fn kind_name(&self) -> &'static str {
        "fake"
    }

    fn newest_output(&self) -> Option<OutputStamp> {
        self.output.clone()
    }

    fn needs_build(
        &self,
        _ctx: &BuildContext<'_>,
        newest_input: Option<&OutputStamp>,
    ) -> anyhow::Result<Decision> {
        *self.seen_input.0.lock().unwrap() = newest_input.map(|s| s.path.clone());
        if self.stale {
            Ok(Decision::Build("out of date".to_string()))
        } else {
            Ok(Decision::Skip("up to date".to_string()))
        }
    }

    fn build(&self, _ctx: &BuildContext<'_>) -> anyhow::Result<BuildOutcome> {
        self.builds.bump();
        if self.fail {
            anyhow::bail!("scripted failure");
        }
        Ok(self.outcome.unwrap_or(BuildOutcome::Rebuilt))
    }

    fn clean(&self, _ctx: &BuildContext<'_>, for_build: bool) -> anyhow::Result<()> {
        self.cleans.bump();
        if for_build {
            self.cleaned_for_build.bump();
        }
        Ok(())
    }

    fn clean_forbidden(&self, _ctx: &BuildContext<'_>) -> bool {
        self.no_clean
    }
}
