//! Concrete task kinds and their construction from configuration

mod command;
mod library;

use std::path::Path;

use ratchet_core::config::{Config, SubjectConfig};

pub use command::CommandTask;
pub use library::LibraryTask;

use crate::dag::BuildNode;
use crate::kind::TaskKind;
use crate::subject::{Subject, SubjectKind};

/// Graph node for a configured subject. Relative paths resolve against `root`.
pub fn node_from_config(config: &SubjectConfig, root: &Path) -> BuildNode {
    let kind = SubjectKind::from(config.kind);
    let task: Box<dyn TaskKind> = match kind {
        SubjectKind::Library => {
            let path = config.path.clone().unwrap_or_default();
            Box::new(LibraryTask::new(root.join(path)))
        }
        _ => Box::new(
            CommandTask::new(kind, root, config.command.clone().unwrap_or_default())
                .with_clean_command(config.clean_command.clone())
                .with_inputs(config.inputs.clone())
                .with_outputs(config.outputs.clone()),
        ),
    };
    BuildNode::new(
        Subject::new(config.name.clone(), kind),
        task,
        config.deps.clone(),
    )
}

/// Graph nodes for every configured subject, in declaration order
pub fn nodes_from_config(config: &Config, root: &Path) -> Vec<BuildNode> {
    config
        .subjects
        .iter()
        .map(|s| node_from_config(s, root))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratchet_core::config::SubjectKindConfig;
    use std::path::PathBuf;

    #[test]
    fn test_nodes_from_config() {
        let config = Config {
            subjects: vec![
                SubjectConfig {
                    name: "junit".to_string(),
                    kind: SubjectKindConfig::Library,
                    path: Some(PathBuf::from("lib/junit.jar")),
                    ..Default::default()
                },
                SubjectConfig {
                    name: "core".to_string(),
                    command: Some("make".to_string()),
                    deps: vec!["junit".to_string()],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let nodes = nodes_from_config(&config, Path::new("/work"));
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind.kind_name(), "library");
        assert_eq!(nodes[1].kind.kind_name(), "project");
        assert_eq!(nodes[1].deps, vec!["junit".to_string()]);
        assert_eq!(nodes[1].subject.kind, SubjectKind::Project);
    }
}
