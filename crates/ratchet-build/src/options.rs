//! Run configuration shared by every build task of one invocation

use std::path::PathBuf;

use ratchet_core::config::{BuildConfig, SHALLOW_DEPENDENCY_CHECKS_ENV};
use tracing::warn;

/// Options for one build invocation
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Clean every subject before building it
    pub clean: bool,
    /// Rebuild regardless of staleness
    pub force: bool,
    /// Only build the named subjects
    pub only: Option<Vec<String>>,
    /// Ignore the newest dependency output for non-native subjects
    pub shallow_dependency_checks: bool,
    /// Prefix log lines with the wall-clock time and report durations
    pub print_timing: bool,
    /// Name every updated dependency in rebuild reasons
    pub verbose: bool,
    /// Directory for persisted build state
    pub output_dir: PathBuf,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from_config(&BuildConfig::default())
    }
}

impl BuildOptions {
    /// Options derived from the `[build]` configuration section
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            clean: false,
            force: false,
            only: None,
            shallow_dependency_checks: config.shallow_dependency_checks,
            print_timing: config.print_timing,
            verbose: false,
            output_dir: config.output_dir.clone(),
        }
    }

    /// Set the allow-list from a comma separated list of subject names
    pub fn with_only(mut self, only: Option<&str>) -> Self {
        self.only = only.map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        });
        self
    }

    /// Whether `name` is excluded by the `only` allow-list
    pub fn excludes(&self, name: &str) -> bool {
        match &self.only {
            Some(only) => !only.iter().any(|n| n == name),
            None => false,
        }
    }
}

/// Decide whether shallow dependency checks are on.
///
/// The environment variable wins over both the command line and the
/// configuration file.
pub fn shallow_dependency_checks(explicit: Option<bool>, configured: bool) -> bool {
    let env = std::env::var(SHALLOW_DEPENDENCY_CHECKS_ENV).ok();
    resolve_shallow_dependency_checks(env.as_deref(), explicit, configured)
}

fn resolve_shallow_dependency_checks(
    env: Option<&str>,
    explicit: Option<bool>,
    configured: bool,
) -> bool {
    match env {
        None => explicit.unwrap_or(configured),
        Some(value) => {
            let enabled = value == "true";
            if explicit.is_some() && enabled {
                warn!(
                    "Explicit shallow dependency checks argument is overridden by {}",
                    SHALLOW_DEPENDENCY_CHECKS_ENV
                );
            }
            enabled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_allow_list() {
        let opts = BuildOptions::default().with_only(Some("core, app"));
        assert!(!opts.excludes("core"));
        assert!(!opts.excludes("app"));
        assert!(opts.excludes("docs"));
    }

    #[test]
    fn test_no_allow_list_excludes_nothing() {
        let opts = BuildOptions::default();
        assert!(!opts.excludes("anything"));
    }

    #[test]
    fn test_shallow_checks_without_env() {
        assert!(!resolve_shallow_dependency_checks(None, None, false));
        assert!(resolve_shallow_dependency_checks(None, None, true));
        assert!(resolve_shallow_dependency_checks(None, Some(true), false));
        assert!(!resolve_shallow_dependency_checks(None, Some(false), true));
    }

    #[test]
    fn test_shallow_checks_env_overrides() {
        assert!(resolve_shallow_dependency_checks(Some("true"), Some(false), false));
        assert!(!resolve_shallow_dependency_checks(Some("false"), Some(true), true));
        assert!(!resolve_shallow_dependency_checks(Some("yes"), None, true));
    }
}
