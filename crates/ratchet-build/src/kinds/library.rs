//! Prebuilt library files

use std::path::PathBuf;

use anyhow::bail;

use crate::kind::{BuildContext, BuildOutcome, Decision, TaskKind};
use crate::stamp::OutputStamp;
use crate::subject::Subject;

/// A library that is provided, not built. Its only artifact is the file itself.
#[derive(Debug, Clone)]
pub struct LibraryTask {
    path: PathBuf,
}

impl LibraryTask {
    /// Create a task checking for the library at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TaskKind for LibraryTask {
    fn kind_name(&self) -> &'static str {
        "library"
    }

    fn describe(&self, subject: &Subject) -> String {
        format!("Checking {}", subject.name)
    }

    fn newest_output(&self) -> Option<OutputStamp> {
        OutputStamp::of(&self.path)
    }

    fn needs_build(
        &self,
        _ctx: &BuildContext<'_>,
        _newest_input: Option<&OutputStamp>,
    ) -> anyhow::Result<Decision> {
        if self.path.exists() {
            Ok(Decision::Skip("present".to_string()))
        } else {
            Ok(Decision::Build(format!("{} does not exist", self.path.display())))
        }
    }

    fn build(&self, ctx: &BuildContext<'_>) -> anyhow::Result<BuildOutcome> {
        if !self.path.exists() {
            bail!(
                "library {} is missing: {} does not exist",
                ctx.subject,
                self.path.display()
            );
        }
        Ok(BuildOutcome::UpToDate)
    }

    fn clean(&self, _ctx: &BuildContext<'_>, _for_build: bool) -> anyhow::Result<()> {
        Ok(())
    }

    fn clean_forbidden(&self, _ctx: &BuildContext<'_>) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildOptions;
    use crate::reporter::CollectingReporter;
    use crate::subject::SubjectKind;
    use tempfile::TempDir;

    #[test]
    fn test_library_presence() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lib.jar");
        let task = LibraryTask::new(&path);
        let subject = Subject::new("lib", SubjectKind::Library);
        let options = BuildOptions::default();
        let reporter = CollectingReporter::default();
        let ctx = BuildContext {
            subject: &subject,
            options: &options,
            reporter: &reporter,
        };

        assert!(task.needs_build(&ctx, None).unwrap().is_build());
        assert!(task.build(&ctx).is_err());
        assert!(task.newest_output().is_none());
        assert!(task.clean_forbidden(&ctx));

        std::fs::write(&path, "jar").unwrap();
        assert!(!task.needs_build(&ctx, None).unwrap().is_build());
        assert_eq!(task.build(&ctx).unwrap(), BuildOutcome::UpToDate);
        assert_eq!(task.newest_output().unwrap().path, path);
    }
}
