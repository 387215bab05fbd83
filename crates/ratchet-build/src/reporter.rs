//! Build execution reporting

use std::sync::Mutex;
use std::time::Duration;

use crate::kind::BuildOutcome;

/// Events emitted while executing build tasks
#[derive(Debug, Clone)]
pub enum BuildEvent {
    /// A subject is being cleaned on request
    Cleaning { subject: String },
    /// A build is starting
    Started {
        subject: String,
        task: String,
        reason: String,
    },
    /// A build step produced output
    Output {
        subject: String,
        line: String,
        is_stderr: bool,
    },
    /// A build finished
    Completed {
        subject: String,
        task: String,
        duration: Duration,
        outcome: BuildOutcome,
    },
    /// A build was not needed or not allowed
    Skipped {
        subject: String,
        reason: Option<String>,
    },
    /// A build failed
    Failed {
        subject: String,
        task: String,
        error: String,
    },
    /// An execution wave is starting
    WaveStarted { wave: usize, task_count: usize },
    /// All scheduled tasks are done
    AllCompleted {
        total: usize,
        rebuilt: usize,
        up_to_date: usize,
        failed: usize,
        duration: Duration,
    },
}

/// Trait for reporting build progress
pub trait BuildReporter: Send + Sync {
    /// Handle a build event
    fn report(&self, event: &BuildEvent);
}

/// Simple reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl BuildReporter for TracingReporter {
    fn report(&self, event: &BuildEvent) {
        match event {
            BuildEvent::Cleaning { subject } => {
                tracing::info!("Cleaning {}...", subject);
            }
            BuildEvent::Started { task, reason, .. } => {
                tracing::info!("{}... [{}]", task, reason);
            }
            BuildEvent::Output {
                subject,
                line,
                is_stderr,
            } => {
                if *is_stderr {
                    tracing::warn!("[{}] {}", subject, line);
                } else {
                    tracing::debug!("[{}] {}", subject, line);
                }
            }
            BuildEvent::Completed { task, duration, .. } => {
                tracing::info!("{} [duration: {:.1}s]", task, duration.as_secs_f64());
            }
            BuildEvent::Skipped { subject, reason } => match reason {
                Some(reason) => tracing::debug!("[{} - skipping {}]", reason, subject),
                None => tracing::debug!("[skipping {}]", subject),
            },
            BuildEvent::Failed { task, error, .. } => {
                tracing::error!("{}: Failed due to error: {}", task, error);
            }
            BuildEvent::WaveStarted { wave, task_count } => {
                tracing::debug!("Starting wave {} ({} tasks)", wave, task_count);
            }
            BuildEvent::AllCompleted {
                total,
                rebuilt,
                up_to_date,
                failed,
                duration,
            } => {
                tracing::info!(
                    "Build complete: {} rebuilt, {} up to date, {} failed of {} ({:.1}s)",
                    rebuilt,
                    up_to_date,
                    failed,
                    total,
                    duration.as_secs_f64()
                );
            }
        }
    }
}

/// Reporter that collects events for later inspection
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<BuildEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<BuildEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl BuildReporter for CollectingReporter {
    fn report(&self, event: &BuildEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::default();

        reporter.report(&BuildEvent::Started {
            subject: "core".to_string(),
            task: "Building core".to_string(),
            reason: "forced build".to_string(),
        });
        reporter.report(&BuildEvent::Completed {
            subject: "core".to_string(),
            task: "Building core".to_string(),
            duration: Duration::from_secs(5),
            outcome: BuildOutcome::Rebuilt,
        });

        assert_eq!(reporter.events().len(), 2);
    }

    #[test]
    fn test_tracing_reporter() {
        let reporter = TracingReporter;

        // Just verify it doesn't panic
        reporter.report(&BuildEvent::Skipped {
            subject: "core".to_string(),
            reason: None,
        });
        reporter.report(&BuildEvent::Skipped {
            subject: "core".to_string(),
            reason: Some("up to date".to_string()),
        });
    }
}
