//! Output artifact modification stamps

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// An existing build artifact together with its modification time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputStamp {
    /// Artifact path
    pub path: PathBuf,
    /// Last modification time
    pub modified: SystemTime,
}

impl OutputStamp {
    /// Create a stamp from explicit values
    pub fn new(path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            modified,
        }
    }

    /// Stamp of an existing file, or `None` if it cannot be read
    pub fn of(path: &Path) -> Option<Self> {
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
        Some(Self::new(path, modified))
    }

    /// The newest of the given paths that exist. Ties keep the first one.
    pub fn newest<I, P>(paths: I) -> Option<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .filter_map(|p| Self::of(p.as_ref()))
            .fold(None, |newest: Option<Self>, stamp| match newest {
                Some(n) if !stamp.is_newer_than(&n) => Some(n),
                _ => Some(stamp),
            })
    }

    /// The oldest of the given paths that exist. Ties keep the first one.
    pub fn oldest<I, P>(paths: I) -> Option<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .filter_map(|p| Self::of(p.as_ref()))
            .fold(None, |oldest: Option<Self>, stamp| match oldest {
                Some(o) if !o.is_newer_than(&stamp) => Some(o),
                _ => Some(stamp),
            })
    }

    /// Whether this artifact was modified strictly after `other`
    pub fn is_newer_than(&self, other: &OutputStamp) -> bool {
        self.modified > other.modified
    }
}

impl fmt::Display for OutputStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
