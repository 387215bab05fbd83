//! Configuration validation

use std::collections::HashSet;

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::{Config, SubjectKindConfig};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_build(config)?;
    validate_subjects(config)?;
    validate_gate(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_build(config: &Config) -> Result<()> {
    if config.build.parallelism == 0 {
        return Err(ConfigError::invalid("build.parallelism", "must be at least 1").into());
    }

    if config.build.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::invalid("build.output_dir", "cannot be empty").into());
    }

    Ok(())
}

fn validate_subjects(config: &Config) -> Result<()> {
    if !config.subjects.is_empty() {
        debug!(count = config.subjects.len(), "validating subjects");
    }

    let names: HashSet<&str> = config.subjects.iter().map(|s| s.name.as_str()).collect();
    let mut seen = HashSet::new();

    for (i, subject) in config.subjects.iter().enumerate() {
        if subject.name.is_empty() {
            return Err(ConfigError::invalid(
                format!("subjects[{}].name", i),
                "subject name cannot be empty",
            )
            .into());
        }

        if !seen.insert(subject.name.as_str()) {
            return Err(ConfigError::invalid(
                format!("subjects[{}].name", i),
                format!("duplicate subject '{}'", subject.name),
            )
            .into());
        }

        for dep in &subject.deps {
            if dep == &subject.name {
                return Err(ConfigError::invalid(
                    format!("subjects[{}].deps", i),
                    "a subject cannot depend on itself",
                )
                .into());
            }
            if !names.contains(dep.as_str()) {
                return Err(ConfigError::invalid(
                    format!("subjects[{}].deps", i),
                    format!("unknown subject '{}'", dep),
                )
                .into());
            }
        }

        match subject.kind {
            SubjectKindConfig::Library => {
                if subject.path.is_none() {
                    return Err(ConfigError::invalid(
                        format!("subjects[{}].path", i),
                        "library subjects require a path",
                    )
                    .into());
                }
            }
            _ => {
                if subject.command.is_none() {
                    return Err(ConfigError::invalid(
                        format!("subjects[{}].command", i),
                        format!("{} subjects require a command", subject.kind.as_str()),
                    )
                    .into());
                }
            }
        }
    }

    Ok(())
}

fn validate_gate(config: &Config) -> Result<()> {
    let mut seen = HashSet::new();

    for (i, task) in config.gate.tasks.iter().enumerate() {
        if task.title.is_empty() {
            return Err(ConfigError::invalid(
                format!("gate.tasks[{}].title", i),
                "task title cannot be empty",
            )
            .into());
        }

        if !seen.insert(task.title.as_str()) {
            return Err(ConfigError::invalid(
                format!("gate.tasks[{}].title", i),
                format!("gate task with title \"{}\" is already defined", task.title),
            )
            .into());
        }

        if task.command.is_none() && !task.build {
            return Err(ConfigError::invalid(
                format!("gate.tasks[{}]", i),
                "a task needs a command or build = true",
            )
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GateTaskConfig, SubjectConfig};

    fn subject(name: &str, deps: &[&str]) -> SubjectConfig {
        SubjectConfig {
            name: name.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            command: Some("true".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_parallelism() {
        let mut config = Config::default();
        config.build.parallelism = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_unknown_dependency() {
        let mut config = Config::default();
        config.subjects = vec![subject("app", &["missing"])];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_duplicate_subject() {
        let mut config = Config::default();
        config.subjects = vec![subject("core", &[]), subject("core", &[])];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_library_requires_path() {
        let mut config = Config::default();
        config.subjects = vec![SubjectConfig {
            name: "junit".to_string(),
            kind: SubjectKindConfig::Library,
            ..Default::default()
        }];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_duplicate_gate_title() {
        let mut config = Config::default();
        let task = GateTaskConfig {
            title: "Build".to_string(),
            build: true,
            ..Default::default()
        };
        config.gate.tasks = vec![task.clone(), task];

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("already defined"));
    }

    #[test]
    fn test_validate_valid_graph() {
        let mut config = Config::default();
        config.subjects = vec![subject("core", &[]), subject("app", &["core"])];
        assert!(validate_config(&config).is_ok());
    }
}
