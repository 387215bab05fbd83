//! Ratchet Core - Shared configuration and error types
//!
//! This crate provides the configuration model read from `ratchet.toml` /
//! `ratchet.yaml` and the error types shared by the build engine, the gate
//! harness and the CLI.

pub mod config;
pub mod error;

pub use config::{
    find_config, load_config, load_config_from_dir, BuildConfig, Config, GateConfig,
    GateTaskConfig, SubjectConfig, SubjectKindConfig,
};
pub use error::{ConfigError, RatchetError, Result};
