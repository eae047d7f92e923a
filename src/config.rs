//! Application configuration, read from `config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::NewSettings;

const APP_DIR: &str = "todo-week";

/// Data root: the database and the log directory live here.
///
/// Resolves to `dirs::data_dir()/todo-week/`. Override with `TODO_WEEK_DATA_DIR`.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("TODO_WEEK_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("/tmp/todo-week-data"))
}

/// Resolves to `dirs::config_dir()/todo-week/`. Override with `TODO_WEEK_CONFIG_DIR`.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("TODO_WEEK_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("/tmp/todo-week-config"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file holding todos, settings and rewards.
    pub database_path: PathBuf,
    pub log: LogConfig,
    /// Used when the settings row does not exist yet.
    pub defaults: NewSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: data_dir().join("todos.sqlite"),
            log: LogConfig::default(),
            defaults: NewSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Where the terminal UI writes its log file.
    pub directory: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: data_dir().join("logs"),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reads `path` if given, else the default location when it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = Self::default_config_path();
                if path.is_file() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_config_path() -> PathBuf {
        config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_initial_settings_row() {
        let config = AppConfig::default();
        assert_eq!(config.defaults.week_size, 5);
        assert_eq!(config.defaults.max_high_per_week, 2);
        assert_eq!(config.defaults.max_medium_per_week, 2);
        assert_eq!(config.log.level, "info");
        assert!(config.database_path.ends_with("todos.sqlite"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "database_path = \"/srv/todos.sqlite\"\n\n[defaults]\nweek_size = 8\n",
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/srv/todos.sqlite"));
        assert_eq!(config.defaults.week_size, 8);
        assert_eq!(config.defaults.max_high_per_week, 2);
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.log.level = "debug".to_string();
        config.defaults.max_medium_per_week = 3;
        config.save_to_file(&path).unwrap();

        assert_eq!(AppConfig::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();
        assert!(matches!(AppConfig::from_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/todo-week/config.toml")));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
