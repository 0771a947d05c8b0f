use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The platform's true capacity is not queryable, so the quota ceiling
/// is a conservative constant, kept injectable through the config file.
pub const DEFAULT_CAPACITY_BYTES: u64 = 4_000_000;
/// The simulated hard limit the substrate itself enforces.
pub const DEFAULT_HARD_LIMIT_BYTES: u64 = 5_000_000;
pub const DEFAULT_ARCHIVE_AFTER_DAYS: i64 = 90;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub capacity_bytes: u64,
    pub hard_limit_bytes: u64,
    pub archive_after_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            hard_limit_bytes: DEFAULT_HARD_LIMIT_BYTES,
            archive_after_days: DEFAULT_ARCHIVE_AFTER_DAYS,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "I/O error: {}", err),
            ConfigError::Parse(err) => write!(f, "config parse error: {}", err),
            ConfigError::Serialize(err) => write!(f, "config serialize error: {}", err),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Serialize(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Parse(value)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(value: toml::ser::Error) -> Self {
        ConfigError::Serialize(value)
    }
}

pub fn config_path(store_root: &Path) -> PathBuf {
    store_root.join(".tack").join("config.toml")
}

/// Load the store config; a missing file means defaults.
pub fn load(store_root: &Path) -> Result<Config, ConfigError> {
    let path = config_path(store_root);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

pub fn save(store_root: &Path, config: &Config) -> Result<(), ConfigError> {
    let path = config_path(store_root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use uuid::Uuid;

    use super::{load, save, Config};

    fn unique_workspace() -> PathBuf {
        let root = std::env::temp_dir().join(format!("tack-config-test-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&root).expect("workspace should be creatable");
        root
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let root = unique_workspace();
        let config = load(&root).expect("load should succeed");
        assert_eq!(config, Config::default());
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn save_then_load_round_trips() {
        let root = unique_workspace();
        let config = Config {
            capacity_bytes: 1_234,
            hard_limit_bytes: 2_345,
            archive_after_days: 30,
        };
        save(&root, &config).expect("save should succeed");
        assert_eq!(load(&root).expect("load should succeed"), config);
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn partial_config_files_fill_in_defaults() {
        let root = unique_workspace();
        let dir = root.join(".tack");
        std::fs::create_dir_all(&dir).expect("config dir should be creatable");
        std::fs::write(dir.join("config.toml"), "capacity_bytes = 777\n")
            .expect("partial config should write");
        let config = load(&root).expect("load should succeed");
        assert_eq!(config.capacity_bytes, 777);
        assert_eq!(config.hard_limit_bytes, Config::default().hard_limit_bytes);
        let _ = std::fs::remove_dir_all(root);
    }
}
