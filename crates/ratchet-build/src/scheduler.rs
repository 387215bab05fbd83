//! Build scheduler: async executor using tokio

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, instrument};

use crate::dag::BuildGraph;
use crate::reporter::{BuildEvent, BuildReporter};

/// Result of a single build task execution
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Subject that was processed
    pub subject: String,
    /// What happened to it
    pub status: BuildStatus,
    /// How long the task took
    pub duration: Duration,
}

/// Build task execution status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// Artifacts were rebuilt
    Rebuilt,
    /// Nothing needed to be done
    UpToDate,
    /// The task did not run
    Skipped(String),
    /// The task failed
    Failed(String),
}

impl BuildStatus {
    /// Check if this status represents a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Options for the build scheduler
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Maximum concurrent build tasks
    pub parallelism: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// Build scheduler: executes a build graph on a bounded worker pool
pub struct BuildScheduler {
    options: SchedulerOptions,
    reporter: Arc<dyn BuildReporter>,
}

impl BuildScheduler {
    /// Create a new scheduler
    pub fn new(options: SchedulerOptions, reporter: Arc<dyn BuildReporter>) -> Self {
        Self { options, reporter }
    }

    /// Execute every task of the graph.
    ///
    /// A wave only starts once every task of the previous wave has finished,
    /// so each task observes the final state of all its dependencies. After a
    /// failure the remaining waves are skipped.
    #[instrument(skip_all, fields(tasks = graph.len(), parallelism = self.options.parallelism))]
    pub async fn execute(&self, graph: &BuildGraph) -> Vec<BuildResult> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.options.parallelism.max(1)));
        let mut all_results: HashMap<String, BuildResult> = HashMap::new();
        let mut failed = false;

        for (wave_idx, wave) in graph.waves().enumerate() {
            if failed {
                for task in wave {
                    all_results.insert(
                        task.name().to_string(),
                        BuildResult {
                            subject: task.name().to_string(),
                            status: BuildStatus::Skipped("an earlier build failed".to_string()),
                            duration: Duration::ZERO,
                        },
                    );
                }
                continue;
            }

            self.reporter.report(&BuildEvent::WaveStarted {
                wave: wave_idx,
                task_count: wave.len(),
            });

            let mut handles = Vec::new();
            for task in wave {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        failed = true;
                        all_results.insert(
                            task.name().to_string(),
                            BuildResult {
                                subject: task.name().to_string(),
                                status: BuildStatus::Failed(e.to_string()),
                                duration: Duration::ZERO,
                            },
                        );
                        continue;
                    }
                };

                let name = task.name().to_string();
                let task = task.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    let started = Instant::now();
                    let status = match task.execute() {
                        Ok(status) => status,
                        Err(e) => BuildStatus::Failed(e.to_string()),
                    };
                    drop(permit);
                    (status, started.elapsed())
                });
                handles.push((name, handle));
            }

            for (subject, handle) in handles {
                let (status, duration) = match handle.await {
                    Ok(result) => result,
                    Err(e) => (
                        BuildStatus::Failed(format!("Build task panicked: {}", e)),
                        Duration::ZERO,
                    ),
                };
                if status.is_failure() {
                    failed = true;
                }
                debug!(subject = %subject, ?status, "build task finished");
                all_results.insert(
                    subject.clone(),
                    BuildResult {
                        subject,
                        status,
                        duration,
                    },
                );
            }
        }

        let total = all_results.len();
        let count = |f: fn(&BuildStatus) -> bool| {
            all_results.values().filter(|r| f(&r.status)).count()
        };
        self.reporter.report(&BuildEvent::AllCompleted {
            total,
            rebuilt: count(|s| *s == BuildStatus::Rebuilt),
            up_to_date: count(|s| *s == BuildStatus::UpToDate),
            failed: count(BuildStatus::is_failure),
            duration: start.elapsed(),
        });

        // Return results in topological order
        graph
            .sorted()
            .iter()
            .filter_map(|task| all_results.remove(task.name()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::BuildNode;
    use crate::options::BuildOptions;
    use crate::reporter::CollectingReporter;
    use crate::subject::Subject;
    use crate::testing::FakeKind;
    use tempfile::TempDir;

    fn node(name: &str, kind: FakeKind, deps: &[&str]) -> BuildNode {
        BuildNode::new(
            Subject::project(name),
            Box::new(kind),
            deps.iter().map(|d| d.to_string()).collect(),
        )
    }

    fn graph(dir: &TempDir, nodes: Vec<BuildNode>) -> BuildGraph {
        let options = BuildOptions {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        BuildGraph::build(
            nodes,
            Arc::new(options),
            Arc::new(CollectingReporter::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_build_status_is_failure() {
        assert!(BuildStatus::Failed("error".to_string()).is_failure());
        assert!(!BuildStatus::Rebuilt.is_failure());
        assert!(!BuildStatus::UpToDate.is_failure());
        assert!(!BuildStatus::Skipped("not selected".to_string()).is_failure());
    }

    #[test]
    fn test_scheduler_options_default() {
        assert!(SchedulerOptions::default().parallelism > 0);
    }

    #[tokio::test]
    async fn test_diamond_rebuilds_through_shared_dependency() {
        let temp = TempDir::new().unwrap();
        let core = FakeKind::stale();
        let core_builds = core.builds.clone();
        let app = FakeKind::fresh();
        let app_builds = app.builds.clone();
        let g = graph(
            &temp,
            vec![
                node("core", core, &[]),
                node("left", FakeKind::fresh(), &["core"]),
                node("right", FakeKind::fresh(), &["core"]),
                node("app", app, &["left", "right"]),
            ],
        );

        let reporter = Arc::new(CollectingReporter::default());
        let scheduler = BuildScheduler::new(SchedulerOptions { parallelism: 2 }, reporter.clone());
        let results = scheduler.execute(&g).await;

        let statuses: Vec<(&str, &BuildStatus)> = results
            .iter()
            .map(|r| (r.subject.as_str(), &r.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("core", &BuildStatus::Rebuilt),
                ("left", &BuildStatus::Rebuilt),
                ("right", &BuildStatus::Rebuilt),
                ("app", &BuildStatus::Rebuilt),
            ]
        );
        assert_eq!(core_builds.get(), 1);
        assert_eq!(app_builds.get(), 1);
        assert!(reporter.events().iter().any(|e| matches!(
            e,
            BuildEvent::AllCompleted { total: 4, rebuilt: 4, .. }
        )));
    }

    #[tokio::test]
    async fn test_second_run_is_up_to_date() {
        let temp = TempDir::new().unwrap();
        let scheduler = BuildScheduler::new(
            SchedulerOptions { parallelism: 4 },
            Arc::new(CollectingReporter::default()),
        );

        let first = graph(
            &temp,
            vec![node("core", FakeKind::stale(), &[]), node("app", FakeKind::fresh(), &["core"])],
        );
        scheduler.execute(&first).await;

        let second = graph(
            &temp,
            vec![node("core", FakeKind::fresh(), &[]), node("app", FakeKind::fresh(), &["core"])],
        );
        let results = scheduler.execute(&second).await;
        assert!(results.iter().all(|r| r.status == BuildStatus::UpToDate));
    }

    #[tokio::test]
    async fn test_failure_skips_later_waves() {
        let temp = TempDir::new().unwrap();
        let g = graph(
            &temp,
            vec![
                node("core", FakeKind::stale().failing(), &[]),
                node("other", FakeKind::stale(), &[]),
                node("app", FakeKind::stale(), &["core"]),
            ],
        );

        let scheduler = BuildScheduler::new(
            SchedulerOptions { parallelism: 1 },
            Arc::new(CollectingReporter::default()),
        );
        let results = scheduler.execute(&g).await;

        assert!(results[0].status.is_failure());
        assert_eq!(results[1].status, BuildStatus::Rebuilt);
        assert!(matches!(results[2].status, BuildStatus::Skipped(_)));
    }
}
