//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "ratchet.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "ratchet.yaml";

/// Environment variable overriding `build.shallow_dependency_checks`
pub const SHALLOW_DEPENDENCY_CHECKS_ENV: &str = "RATCHET_BUILD_SHALLOW_DEPENDENCY_CHECKS";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".ratchet.toml",
        ".ratchet.yaml",
    ]
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Ratchet Configuration

[build]
output_dir = ".ratchet"
parallelism = 4
shallow_dependency_checks = false
print_timing = false

# [[subjects]]
# name = "core"
# kind = "project"
# command = "make -C core"
# clean_command = "make -C core clean"
# inputs = ["core/src/**/*.c"]
# outputs = ["core/build/libcore.a"]

[gate]
strict_mode = false
strict_selection = true

# [[gate.tasks]]
# title = "BuildWithMake"
# tags = ["build"]
# build = true
"#;
