//! Configuration loader with hierarchical merging.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid maxSessions: {0}. Must be at least 1")]
    InvalidMaxSessions(usize),

    #[error("Invalid maxSessionsPerProject: {0}. Must be at least 1")]
    InvalidMaxPerProject(usize),

    #[error("scanPaths cannot be empty")]
    EmptyScanPaths,

    #[error("Invalid timeout: {0}. Must be positive")]
    InvalidTimeout(u64),
}

/// Configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `<data_dir>/config.yaml`
    /// 3. Environment variables (`MAXCLAW_*` prefix)
    pub fn load(data_dir: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(data_dir.join("config.yaml")))
            .merge(Env::prefixed("MAXCLAW_").split("__"))
            .extract()
            .context("failed to extract configuration")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file only.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Persist a configuration as YAML.
    pub fn save(config: &Config, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(config).context("failed to serialize config")?;
        std::fs::write(path.as_ref(), yaml).context("failed to write config file")?;
        Ok(())
    }

    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.multiplex.max_sessions == 0 {
            return Err(ConfigError::InvalidMaxSessions(config.multiplex.max_sessions));
        }
        if config.multiplex.max_sessions_per_project == 0 {
            return Err(ConfigError::InvalidMaxPerProject(
                config.multiplex.max_sessions_per_project,
            ));
        }
        if config.scan_paths.is_empty() {
            return Err(ConfigError::EmptyScanPaths);
        }
        if config.default_options.timeout == 0 {
            return Err(ConfigError::InvalidTimeout(config.default_options.timeout));
        }
        Ok(())
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Resolve the data directory: `MAXCLAW_DATA_DIR` env, then the config's
/// `dataDir`, then `~/.maxclaw`.
pub fn resolve_data_dir(configured: Option<&str>) -> PathBuf {
    if let Ok(dir) = std::env::var("MAXCLAW_DATA_DIR") {
        if !dir.is_empty() {
            return expand_tilde(&dir);
        }
    }
    expand_tilde(configured.unwrap_or("~/.maxclaw"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        ConfigLoader::validate(&Config::default()).expect("defaults should validate");
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.multiplex.max_sessions = 7;
        config.scan_paths = vec!["/srv/code".to_string()];

        ConfigLoader::save(&config, &path).unwrap();
        let loaded = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validation_rejects_zero_caps() {
        let mut config = Config::default();
        config.multiplex.max_sessions = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxSessions(0))
        ));

        let mut config = Config::default();
        config.multiplex.max_sessions_per_project = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxPerProject(0))
        ));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "multiplex:\n  maxSessions: 9").unwrap();

        let loaded = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(loaded.multiplex.max_sessions, 9);
        // Untouched keys keep their defaults.
        assert_eq!(loaded.multiplex.max_sessions_per_project, 2);
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/x"), home.join("x"));
        }
    }
}
