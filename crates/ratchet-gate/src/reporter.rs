//! Gate progress reporting

use std::sync::Mutex;
use std::time::Duration;

use crate::timing::format_duration;

/// Events emitted during a gate run
#[derive(Debug, Clone)]
pub enum GateEvent {
    /// A selected task begins; `stamp` is the rendered timestamp prefix
    Begin { stamp: String, title: String },
    /// A task finished
    End {
        stamp: String,
        title: String,
        duration: Duration,
    },
    /// A task or the whole gate aborted
    Abort {
        stamp: String,
        title: String,
        duration: Duration,
    },
    /// A task was not selected
    Skipped { title: String },
    /// A top-level command is about to run
    Command { line: String },
    /// A soft failure that did not abort the run
    Warning { message: String },
    /// Informational message
    Info { message: String },
    /// Commands executed before a failure, and how to reproduce the run
    Transcript {
        commands: Vec<String>,
        reproduce: String,
    },
    /// Rendered summary lines
    Summary { lines: Vec<String> },
}

/// Trait for reporting gate progress
pub trait GateReporter: Send + Sync {
    /// Handle a gate event
    fn report(&self, event: &GateEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl GateReporter for TracingReporter {
    fn report(&self, event: &GateEvent) {
        match event {
            GateEvent::Begin { stamp, title } => tracing::info!("{}{}", stamp, title),
            GateEvent::End {
                stamp,
                title,
                duration,
            }
            | GateEvent::Abort {
                stamp,
                title,
                duration,
            } => tracing::info!("{}{} [{}]", stamp, title, format_duration(*duration)),
            GateEvent::Skipped { title } => tracing::debug!("skipping gate task {}", title),
            GateEvent::Command { line } => tracing::info!("Running: {}", line),
            GateEvent::Warning { message } => tracing::warn!("{}", message),
            GateEvent::Info { message } => tracing::info!("{}", message),
            GateEvent::Transcript {
                commands,
                reproduce,
            } => {
                tracing::error!(
                    "The sequence of commands that were executed until the failure follows:"
                );
                for command in commands {
                    tracing::error!("{}", command);
                }
                tracing::error!(
                    "If the previous sequence is incomplete or some commands were executed programmatically use:"
                );
                tracing::error!("{}", reproduce);
            }
            GateEvent::Summary { lines } => {
                for line in lines {
                    tracing::info!("{}", line);
                }
            }
        }
    }
}

/// Reporter that collects events for later inspection
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<GateEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<GateEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Titles of every task that logged BEGIN, in order
    pub fn begun(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                GateEvent::Begin { title, .. } => Some(title),
                _ => None,
            })
            .collect()
    }
}

impl GateReporter for CollectingReporter {
    fn report(&self, event: &GateEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter_begun() {
        let reporter = CollectingReporter::default();
        reporter.report(&GateEvent::Begin {
            stamp: String::new(),
            title: "Versions".to_string(),
        });
        reporter.report(&GateEvent::Skipped {
            title: "Pylint".to_string(),
        });
        assert_eq!(reporter.events().len(), 2);
        assert_eq!(reporter.begun(), vec!["Versions".to_string()]);
    }
}
