//! Runtime settings
//!
//! Settings come from built-in defaults, an optional `graphpack.yaml` in the
//! user's config directory (or the file named by `GRAPHPACK_CONFIG`), and
//! the `GRAPHPACK_CACHE_DIR` / `GRAPHPACK_REMOTES_DIR` environment
//! variables, in increasing order of precedence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, config, fs};

/// Application directory name under the user's cache and config directories
const APP_DIR: &str = "graphpack";

/// Settings file name under the config directory
const SETTINGS_FILE: &str = "graphpack.yaml";

/// Remotes subdirectory under the config directory
const REMOTES_DIR: &str = "remotes";

const DEFAULT_INDEX_TTL_SECS: u64 = 300;
const DEFAULT_ACCESSOR_TIMEOUT_SECS: u64 = 30;

pub const CACHE_DIR_ENV: &str = "GRAPHPACK_CACHE_DIR";
pub const REMOTES_DIR_ENV: &str = "GRAPHPACK_REMOTES_DIR";
pub const CONFIG_ENV: &str = "GRAPHPACK_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root of the local bundle cache
    pub cache_dir: PathBuf,
    /// Directory holding `<name>.remote.yaml` files
    pub remotes_dir: PathBuf,
    /// Freshness window for remote listings
    pub index_ttl: Duration,
    /// Deadline given to each accessor attempt
    pub accessor_timeout: Duration,
}

#[derive(Deserialize, Default)]
struct SettingsFile {
    #[serde(default)]
    cache_dir: Option<PathBuf>,
    #[serde(default)]
    remotes_dir: Option<PathBuf>,
    #[serde(default)]
    index_ttl_secs: Option<u64>,
    #[serde(default)]
    accessor_timeout_secs: Option<u64>,
}

impl Settings {
    /// Settings rooted in explicit directories, with default timings
    pub fn with_dirs(cache_dir: impl Into<PathBuf>, remotes_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            remotes_dir: remotes_dir.into(),
            index_ttl: Duration::from_secs(DEFAULT_INDEX_TTL_SECS),
            accessor_timeout: Duration::from_secs(DEFAULT_ACCESSOR_TIMEOUT_SECS),
        }
    }

    /// Load settings from defaults, the settings file and the environment
    pub fn load() -> Result<Self> {
        let config_dir = dirs::config_dir().map(|d| d.join(APP_DIR));

        let file_path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| config_dir.as_ref().map(|d| d.join(SETTINGS_FILE)));
        let file = match file_path {
            Some(path) if path.is_file() => Self::read_file(&path)?,
            _ => SettingsFile::default(),
        };

        let cache_dir = match std::env::var_os(CACHE_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => match file.cache_dir {
                Some(dir) => dir,
                None => dirs::cache_dir()
                    .map(|d| d.join(APP_DIR))
                    .ok_or_else(|| fs::cache_failed("Could not determine cache directory"))?,
            },
        };

        let remotes_dir = match std::env::var_os(REMOTES_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => match file.remotes_dir {
                Some(dir) => dir,
                None => config_dir
                    .map(|d| d.join(REMOTES_DIR))
                    .ok_or_else(|| config::invalid("Could not determine config directory"))?,
            },
        };

        let mut settings = Self::with_dirs(cache_dir, remotes_dir);
        if let Some(secs) = file.index_ttl_secs {
            settings.index_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = file.accessor_timeout_secs {
            settings.accessor_timeout = Duration::from_secs(secs);
        }
        Ok(settings)
    }

    fn read_file(path: &Path) -> Result<SettingsFile> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| config::read_failed(path.display().to_string(), e.to_string()))?;
        if content.trim().is_empty() {
            return Ok(SettingsFile::default());
        }
        serde_yaml::from_str(&content)
            .map_err(|e| config::parse_failed(path.display().to_string(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        unsafe {
            std::env::remove_var(CACHE_DIR_ENV);
            std::env::remove_var(REMOTES_DIR_ENV);
            std::env::remove_var(CONFIG_ENV);
        }
    }

    #[test]
    fn test_with_dirs_defaults() {
        let settings = Settings::with_dirs("/c", "/r");
        assert_eq!(settings.index_ttl, Duration::from_secs(300));
        assert_eq!(settings.accessor_timeout, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn test_env_overrides_directories() {
        let temp = TempDir::new().unwrap();
        clear_env();
        unsafe {
            std::env::set_var(CACHE_DIR_ENV, temp.path().join("cache"));
            std::env::set_var(REMOTES_DIR_ENV, temp.path().join("remotes"));
            std::env::set_var(CONFIG_ENV, temp.path().join("absent.yaml"));
        }
        let settings = Settings::load().unwrap();
        clear_env();

        assert_eq!(settings.cache_dir, temp.path().join("cache"));
        assert_eq!(settings.remotes_dir, temp.path().join("remotes"));
    }

    #[test]
    #[serial]
    fn test_settings_file_values() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("graphpack.yaml");
        std::fs::write(
            &file,
            format!(
                "cache_dir: {}\nindex_ttl_secs: 5\naccessor_timeout_secs: 2\nunknown: true\n",
                temp.path().join("c").display()
            ),
        )
        .unwrap();

        clear_env();
        unsafe {
            std::env::set_var(CONFIG_ENV, &file);
            std::env::set_var(REMOTES_DIR_ENV, temp.path().join("r"));
        }
        let settings = Settings::load().unwrap();
        clear_env();

        assert_eq!(settings.cache_dir, temp.path().join("c"));
        assert_eq!(settings.index_ttl, Duration::from_secs(5));
        assert_eq!(settings.accessor_timeout, Duration::from_secs(2));
    }

    #[test]
    #[serial]
    fn test_invalid_settings_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("graphpack.yaml");
        std::fs::write(&file, "index_ttl_secs: [not a number\n").unwrap();

        clear_env();
        unsafe {
            std::env::set_var(CONFIG_ENV, &file);
        }
        let result = Settings::load();
        clear_env();

        assert!(result.is_err());
    }
}
