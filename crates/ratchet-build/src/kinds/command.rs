//! Subjects built by a shell command

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use tracing::debug;

use crate::kind::{BuildContext, BuildOutcome, Decision, TaskKind};
use crate::reporter::BuildEvent;
use crate::stamp::OutputStamp;
use crate::subject::{Subject, SubjectKind};

/// A project, native project or distribution produced by a shell command.
///
/// Inputs are glob patterns and outputs plain paths, both relative to `root`.
#[derive(Debug, Clone)]
pub struct CommandTask {
    kind: SubjectKind,
    root: PathBuf,
    command: String,
    clean_command: Option<String>,
    inputs: Vec<String>,
    outputs: Vec<PathBuf>,
}

impl CommandTask {
    /// Create a task running `command` in `root`
    pub fn new(kind: SubjectKind, root: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            kind,
            root: root.into(),
            command: command.into(),
            clean_command: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Set the command removing the outputs
    pub fn with_clean_command(mut self, command: Option<String>) -> Self {
        self.clean_command = command;
        self
    }

    /// Set the input glob patterns
    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the output paths
    pub fn with_outputs(mut self, outputs: Vec<PathBuf>) -> Self {
        self.outputs = outputs;
        self
    }

    fn output_paths(&self) -> Vec<PathBuf> {
        self.outputs.iter().map(|p| self.root.join(p)).collect()
    }

    fn input_paths(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for pattern in &self.inputs {
            let full = self.root.join(pattern);
            let full = full.to_string_lossy();
            let matches =
                glob::glob(&full).with_context(|| format!("invalid input pattern '{}'", pattern))?;
            for entry in matches {
                let path = entry.with_context(|| format!("cannot read input '{}'", pattern))?;
                if path.is_file() {
                    paths.push(path);
                }
            }
        }
        Ok(paths)
    }

    fn run(&self, ctx: &BuildContext<'_>, command: &str) -> anyhow::Result<()> {
        debug!(subject = %ctx.subject, command, "running");
        run_shell(ctx, &self.root, command)
    }
}

impl TaskKind for CommandTask {
    fn kind_name(&self) -> &'static str {
        self.kind.as_str()
    }

    fn describe(&self, subject: &Subject) -> String {
        match self.kind {
            SubjectKind::Distribution => format!("Archiving {}", subject.name),
            _ => format!("Building {}", subject.name),
        }
    }

    fn newest_output(&self) -> Option<OutputStamp> {
        OutputStamp::newest(self.output_paths())
    }

    fn needs_build(
        &self,
        _ctx: &BuildContext<'_>,
        newest_input: Option<&OutputStamp>,
    ) -> anyhow::Result<Decision> {
        let outputs = self.output_paths();
        if outputs.is_empty() {
            return Ok(Decision::Build("no outputs declared".to_string()));
        }
        if let Some(missing) = outputs.iter().find(|p| !p.exists()) {
            return Ok(Decision::Build(format!("{} does not exist", missing.display())));
        }
        let Some(oldest) = OutputStamp::oldest(&outputs) else {
            return Ok(Decision::Build("outputs cannot be read".to_string()));
        };

        if let Some(input) = OutputStamp::newest(self.input_paths()?) {
            if input.is_newer_than(&oldest) {
                return Ok(Decision::Build(format!(
                    "{} is newer than {}",
                    input.path.display(),
                    oldest.path.display()
                )));
            }
        }
        if let Some(input) = newest_input {
            if input.is_newer_than(&oldest) {
                return Ok(Decision::Build(format!(
                    "{} is newer than {}",
                    input.path.display(),
                    oldest.path.display()
                )));
            }
        }

        Ok(Decision::Skip("up to date".to_string()))
    }

    fn build(&self, ctx: &BuildContext<'_>) -> anyhow::Result<BuildOutcome> {
        self.run(ctx, &self.command)?;
        Ok(BuildOutcome::Rebuilt)
    }

    fn clean(&self, ctx: &BuildContext<'_>, for_build: bool) -> anyhow::Result<()> {
        if let Some(command) = &self.clean_command {
            return self.run(ctx, command);
        }
        for path in self.output_paths() {
            debug!(subject = %ctx.subject, for_build, path = %path.display(), "removing output");
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("cannot remove {}", path.display()))
                }
            }
        }
        Ok(())
    }
}

/// Run `command` through `sh -c`, forwarding its output lines to the reporter
fn run_shell(ctx: &BuildContext<'_>, root: &Path, command: &str) -> anyhow::Result<()> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(root)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn `{}`", command))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let mut stderr_tail = Vec::new();

    std::thread::scope(|scope| {
        let errors = scope.spawn(|| {
            let mut lines = Vec::new();
            if let Some(stderr) = stderr {
                forward_lines(ctx, stderr, true, |line| lines.push(line));
            }
            lines
        });
        if let Some(stdout) = stdout {
            forward_lines(ctx, stdout, false, |_| {});
        }
        stderr_tail = errors.join().unwrap_or_default();
    });

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for `{}`", command))?;
    if !status.success() {
        let code = status.code().unwrap_or(-1);
        let tail = stderr_tail.iter().rev().take(5).rev().cloned().collect::<Vec<_>>();
        if tail.is_empty() {
            bail!("command `{}` exited with code {}", command, code);
        }
        bail!("command `{}` exited with code {}: {}", command, code, tail.join("\n"));
    }
    Ok(())
}

fn forward_lines<R: Read>(
    ctx: &BuildContext<'_>,
    reader: R,
    is_stderr: bool,
    mut keep: impl FnMut(String),
) {
    for line in BufReader::new(reader).lines().map_while(Result::ok) {
        ctx.reporter.report(&BuildEvent::Output {
            subject: ctx.subject.name.clone(),
            line: line.clone(),
            is_stderr,
        });
        keep(line);
    }
}
