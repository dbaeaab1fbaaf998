//! TOML configuration file support.
//!
//! Settings used on every run can live in a config file instead of flags:
//!
//! ```toml
//! # poreshrink.toml
//! [shrink]
//! threads = 8
//! group = "000"
//! prefix = "shrunk"
//! print_every = 50
//! repack_program = "/usr/local/bin/h5repack"
//!
//! [watch]
//! poll_interval_ms = 5000
//! ```
//!
//! Command-line flags override values from the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure for poreshrink.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Settings for the shrink command.
    #[serde(default)]
    pub shrink: ShrinkConfig,

    /// Settings for realtime mode.
    #[serde(default)]
    pub watch: WatchSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShrinkConfig {
    /// Number of worker threads.
    pub threads: Option<usize>,

    /// Analysis group suffix, or "all".
    pub group: Option<String>,

    /// Prefix for working copies.
    pub prefix: Option<String>,

    /// Progress dot sampling, 0 disables.
    pub print_every: Option<u32>,

    /// External repack tool.
    pub repack_program: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSettings {
    pub poll_interval_ms: Option<u64>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [shrink]
            threads = 8
            group = "000"
            prefix = "shrunk"
            print_every = 50
            repack_program = "/opt/hdf5/bin/h5repack"

            [watch]
            poll_interval_ms = 5000
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.shrink.threads, Some(8));
        assert_eq!(config.shrink.group.as_deref(), Some("000"));
        assert_eq!(config.shrink.prefix.as_deref(), Some("shrunk"));
        assert_eq!(config.shrink.print_every, Some(50));
        assert_eq!(
            config.shrink.repack_program,
            Some(PathBuf::from("/opt/hdf5/bin/h5repack"))
        );
        assert_eq!(config.watch.poll_interval_ms, Some(5000));
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [shrink]
            threads = 2
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.shrink.threads, Some(2));
        assert_eq!(config.shrink.group, None);
        assert_eq!(config.watch.poll_interval_ms, None);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.shrink.threads, None);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::from_str("[shrink]\ncompression_level = 3\n").is_err());
    }
}
