//! # File Backend
//!
//! Stores each key as a JSON file inside a data directory:
//!
//! ```text
//! data/
//! ├── classes.json
//! └── attendance.json
//! ```
//!
//! Values are written to a temporary file first and then renamed over the
//! target, so a crash mid-write leaves the previous value intact.

use async_trait::async_trait;
use log::{debug, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::storage::error::BackendError;
use crate::storage::traits::KeyValueBackend;

const VALUE_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileBackend {
    base_directory: PathBuf,
}

impl FileBackend {
    /// Open a backend rooted at `base_directory`, creating the directory if needed
    pub async fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self, BackendError> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !fs::try_exists(&base_path).await? {
            fs::create_dir_all(&base_path).await?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Map a key onto a file name. Characters outside `[A-Za-z0-9@._-]`
    /// become `_` so a key can never escape the data directory.
    pub fn file_stem_for_key(key: &str) -> String {
        key.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect::<String>()
            .trim_start_matches('.')
            .to_string()
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.base_directory
            .join(format!("{}.{}", Self::file_stem_for_key(key), VALUE_EXTENSION))
    }
}

#[async_trait]
impl KeyValueBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        match fs::read_to_string(self.value_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let path = self.value_path(key);
        let temp_path = path.with_extension(format!("{}.tmp", VALUE_EXTENSION));

        fs::write(&temp_path, value).await?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!("Wrote {} bytes to {:?}", value.len(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_backend() -> (FileBackend, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let backend = FileBackend::new(temp_dir.path()).await.expect("Failed to open backend");
        (backend, temp_dir)
    }

    #[tokio::test]
    async fn test_set_and_get_value() {
        let (backend, _temp_dir) = setup_backend().await;

        backend.set("classes", "[]").await.expect("Failed to set value");

        let value = backend.get("classes").await.expect("Failed to get value");
        assert_eq!(value.as_deref(), Some("[]"));
        assert!(backend.base_directory().join("classes.json").exists());
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let (backend, _temp_dir) = setup_backend().await;

        let value = backend.get("attendance").await.expect("Query failed");
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_set_replaces_and_leaves_no_temp_file() {
        let (backend, temp_dir) = setup_backend().await;

        backend.set("classes", "[1]").await.unwrap();
        backend.set("classes", "[2]").await.unwrap();

        assert_eq!(backend.get("classes").await.unwrap().as_deref(), Some("[2]"));
        assert!(!temp_dir.path().join("classes.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_keys_are_stored_independently() {
        let (backend, _temp_dir) = setup_backend().await;

        backend.set("classes", "[1]").await.unwrap();
        backend.set("attendance", "[2]").await.unwrap();

        assert_eq!(backend.get("classes").await.unwrap().as_deref(), Some("[1]"));
        assert_eq!(backend.get("attendance").await.unwrap().as_deref(), Some("[2]"));
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("data");

        let backend = FileBackend::new(&nested).await.expect("Failed to open backend");
        backend.set("classes", "[]").await.unwrap();

        assert!(nested.join("classes.json").exists());
    }

    #[test]
    fn test_keys_cannot_escape_directory() {
        assert_eq!(FileBackend::file_stem_for_key("@rollytics_classes"), "@rollytics_classes");
        assert_eq!(FileBackend::file_stem_for_key("../etc/passwd"), "_etc_passwd");
        assert_eq!(FileBackend::file_stem_for_key("a/b"), "a_b");
    }
}
