//! Buildable subjects

use std::fmt;

use ratchet_core::config::SubjectKindConfig;

/// The closed set of buildable subject kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    /// Prebuilt artifact that is only checked for presence
    Library,
    /// Project built by an external tool
    Project,
    /// Native project; its staleness is always checked against dependency outputs
    NativeProject,
    /// Distribution assembled from other subjects
    Distribution,
}

impl SubjectKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Library => "library",
            Self::Project => "project",
            Self::NativeProject => "native-project",
            Self::Distribution => "distribution",
        }
    }

    /// Whether this is a native project
    pub fn is_native(&self) -> bool {
        matches!(self, Self::NativeProject)
    }
}

impl From<SubjectKindConfig> for SubjectKind {
    fn from(kind: SubjectKindConfig) -> Self {
        match kind {
            SubjectKindConfig::Library => Self::Library,
            SubjectKindConfig::Project => Self::Project,
            SubjectKindConfig::NativeProject => Self::NativeProject,
            SubjectKindConfig::Distribution => Self::Distribution,
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a buildable unit
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Subject {
    /// Unique subject name
    pub name: String,
    /// Subject kind
    pub kind: SubjectKind,
}

impl Subject {
    /// Create a new subject
    pub fn new(name: impl Into<String>, kind: SubjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Shorthand for a [`SubjectKind::Project`] subject
    pub fn project(name: impl Into<String>) -> Self {
        Self::new(name, SubjectKind::Project)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_display() {
        let subject = Subject::project("core");
        assert_eq!(subject.to_string(), "core");
    }

    #[test]
    fn test_only_native_projects_are_native() {
        assert!(SubjectKind::NativeProject.is_native());
        assert!(!SubjectKind::Project.is_native());
        assert!(!SubjectKind::Library.is_native());
        assert!(!SubjectKind::Distribution.is_native());
    }

    #[test]
    fn test_kind_from_config() {
        assert_eq!(
            SubjectKind::from(SubjectKindConfig::Distribution),
            SubjectKind::Distribution
        );
        assert_eq!(SubjectKind::from(SubjectKindConfig::default()), SubjectKind::Project);
    }
}
