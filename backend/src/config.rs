//! Backend configuration.
//!
//! Settings come from, in increasing priority:
//!
//! 1. built-in defaults
//! 2. a YAML file: `$ROLLYTICS_CONFIG` if set, otherwise `config.yaml` in the
//!    default data directory when it exists
//! 3. the `ROLLYTICS_DATA_DIR` and `ROLLYTICS_STORAGE` environment variables
//!
//! ```yaml
//! data_directory: /home/me/.local/share/Rollytics
//! storage: sqlite
//! key_prefix: "@rollytics_"
//! recover_corrupt_collections: false
//! log_level: info
//! ```

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_ENV: &str = "ROLLYTICS_CONFIG";
pub const DATA_DIR_ENV: &str = "ROLLYTICS_DATA_DIR";
pub const STORAGE_ENV: &str = "ROLLYTICS_STORAGE";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Which key-value backend holds the collections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// One JSON file per collection in the data directory
    #[default]
    File,
    /// A SQLite database in the data directory
    Sqlite,
    /// Nothing is persisted
    Memory,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageKind::File),
            "sqlite" => Ok(StorageKind::Sqlite),
            "memory" => Ok(StorageKind::Memory),
            other => Err(anyhow::anyhow!("Unknown storage kind: {}", other)),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::File => write!(f, "file"),
            StorageKind::Sqlite => write!(f, "sqlite"),
            StorageKind::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub data_directory: PathBuf,
    pub storage: StorageKind,
    /// Prepended to the `classes` and `attendance` keys
    pub key_prefix: String,
    /// Read an unparseable collection as empty instead of failing
    pub recover_corrupt_collections: bool,
    /// Used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            storage: StorageKind::default(),
            key_prefix: String::new(),
            recover_corrupt_collections: false,
            log_level: "info".to_string(),
        }
    }
}

/// `<platform data dir>/Rollytics`, falling back to `./Rollytics`
pub fn default_data_directory() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Rollytics")
}

impl BackendConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load configuration, reading environment variables through `lookup`
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_yaml_file(&path)?,
            None => {
                let default_file = default_data_directory().join(CONFIG_FILE_NAME);
                if default_file.exists() {
                    Self::from_yaml_file(&default_file)?
                } else {
                    Self::default()
                }
            }
        };

        config.with_env_overrides(lookup)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            warn!("Config file is empty, using defaults");
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            self.data_directory = PathBuf::from(dir);
        }
        if let Some(kind) = lookup(STORAGE_ENV) {
            self.storage = kind
                .parse()
                .with_context(|| format!("Invalid {}", STORAGE_ENV))?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.storage, StorageKind::File);
        assert_eq!(config.key_prefix, "");
        assert!(!config.recover_corrupt_collections);
        assert!(config.data_directory.ends_with("Rollytics"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = BackendConfig::from_yaml_str("storage: sqlite\nkey_prefix: \"@rollytics_\"\n").unwrap();

        assert_eq!(config.storage, StorageKind::Sqlite);
        assert_eq!(config.key_prefix, "@rollytics_");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(BackendConfig::from_yaml_str("storage: floppy").is_err());
        assert_eq!(BackendConfig::from_yaml_str("  \n").unwrap(), BackendConfig::default());
    }

    #[test]
    fn test_config_file_and_env_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("rollytics.yaml");
        fs::write(
            &config_path,
            "data_directory: /tmp/from-file\nstorage: memory\nrecover_corrupt_collections: true\n",
        )
        .unwrap();

        let config = BackendConfig::load_with(env(&[(CONFIG_ENV, config_path.to_str().unwrap())])).unwrap();
        assert_eq!(config.data_directory, PathBuf::from("/tmp/from-file"));
        assert_eq!(config.storage, StorageKind::Memory);
        assert!(config.recover_corrupt_collections);

        let config = BackendConfig::load_with(env(&[
            (CONFIG_ENV, config_path.to_str().unwrap()),
            (DATA_DIR_ENV, "/tmp/from-env"),
            (STORAGE_ENV, "SQLite"),
        ]))
        .unwrap();
        assert_eq!(config.data_directory, PathBuf::from("/tmp/from-env"));
        assert_eq!(config.storage, StorageKind::Sqlite);
    }

    #[test]
    fn test_invalid_storage_env() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("empty.yaml");
        fs::write(&config_path, "").unwrap();

        let result = BackendConfig::load_with(env(&[
            (CONFIG_ENV, config_path.to_str().unwrap()),
            (STORAGE_ENV, "floppy"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let result = BackendConfig::load_with(env(&[(CONFIG_ENV, "/definitely/not/here.yaml")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_storage_kind_round_trip() {
        for kind in [StorageKind::File, StorageKind::Sqlite, StorageKind::Memory] {
            assert_eq!(kind.to_string().parse::<StorageKind>().unwrap(), kind);
        }
    }
}
