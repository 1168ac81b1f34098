//! Resolves the launcher's own bootstrap configuration: where to read
//! its config file from, and the log level to run at.
//!
//! This is distinct from `system/system.cfg` (the frontend's TOML
//! settings, handled by `arkhive_engine::config`) — this one governs
//! the launcher process itself, before anything else has booted.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("malformed config file at {path}: {source}")]
    Parse { path: PathBuf, source: serde_yml::Error },
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    pub log_level: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        LauncherConfig {
            log_level: "debug".to_string(),
        }
    }
}

/// The default search order when no `-config` override is given.
fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/arkhive/config.yaml")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".arkhive").join("config.yaml"));
    }
    paths.push(PathBuf::from("./config.yaml"));
    paths
}

/// Loads the launcher config: the explicit `override_path` if given,
/// otherwise the first existing file in the default search order, or
/// defaults if none exist. `LOG_LEVEL` in the environment always wins
/// over whatever the file says.
pub fn resolve(override_path: Option<&Path>) -> Result<LauncherConfig, ConfigError> {
    let mut config = LauncherConfig::default();

    let candidate = match override_path {
        Some(path) => Some(path.to_path_buf()),
        None => default_search_paths().into_iter().find(|p| p.exists()),
    };

    if let Some(path) = candidate {
        if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let parsed: ConfigFile = serde_yml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
            if let Some(level) = parsed.log_level {
                config.log_level = level;
            }
        }
    }

    if let Ok(env_level) = std::env::var("LOG_LEVEL") {
        config.log_level = env_level;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_defaults_to_debug_with_no_file_or_env() {
        std::env::remove_var("LOG_LEVEL");
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        let config = resolve(Some(&missing)).unwrap();
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn resolve_reads_log_level_from_override_file() {
        std::env::remove_var("LOG_LEVEL");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "log_level: warn\n").unwrap();
        let config = resolve(Some(&path)).unwrap();
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn env_var_overrides_file_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "log_level: warn\n").unwrap();
        std::env::set_var("LOG_LEVEL", "trace");
        let config = resolve(Some(&path)).unwrap();
        std::env::remove_var("LOG_LEVEL");
        assert_eq!(config.log_level, "trace");
    }
}
