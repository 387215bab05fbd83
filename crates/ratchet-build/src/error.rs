//! Build engine errors

use thiserror::Error;

use crate::dag::GraphError;

/// Errors raised while executing build tasks
#[derive(Debug, Error)]
pub enum BuildError {
    /// The subject's build or clean step failed
    #[error("{task}: Failed due to error: {source:#}")]
    Failed {
        /// Subject name
        subject: String,
        /// Task description
        task: String,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },

    /// The saved dependency snapshot could not be read or written
    #[error("Saved dependencies of {subject}: {source}")]
    SavedDeps {
        /// Subject name
        subject: String,
        /// IO failure
        #[source]
        source: std::io::Error,
    },

    /// Invalid build graph
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl BuildError {
    /// Name of the subject the error is attributed to, if any
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Failed { subject, .. } | Self::SavedDeps { subject, .. } => Some(subject),
            Self::Graph(_) => None,
        }
    }
}
