//! CLI commands

mod build;
mod clean;
mod gate;
mod init;

pub use build::BuildCommand;
pub use clean::CleanCommand;
pub use gate::GateCommand;
pub use init::InitCommand;

use std::path::{Path, PathBuf};

use anyhow::Context;
use ratchet_core::config::{load_config_from_dir, Config};
use tracing::debug;

/// Configuration of the enclosing project and the directory holding it
pub(crate) struct Project {
    pub config: Config,
    pub root: PathBuf,
}

impl Project {
    /// Find and load the configuration, searching upwards from `dir`
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let (config, path) = load_config_from_dir(dir)
            .context("No ratchet configuration found; run `ratchet init` to create one")?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dir.to_path_buf());
        debug!(config = %path.display(), root = %root.display(), "loaded project");
        Ok(Self { config, root })
    }

    /// Load the project around the current directory
    pub fn current() -> anyhow::Result<Self> {
        Self::load(&std::env::current_dir()?)
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
