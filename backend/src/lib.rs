//! # Rollytics Backend
//!
//! Persistence and business logic for the Rollytics attendance tracker.
//! A frontend builds one [`Backend`] at startup and calls its services.
//!
//! - **storage**: key-value backends, the JSON collection store, the repository
//! - **domain**: rosters, attendance sessions, statistics
//! - **config** / **logging**: startup plumbing

use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;

pub mod config;
pub mod domain;
pub mod logging;
pub mod storage;

pub use config::{BackendConfig, StorageKind};
pub use domain::{AttendanceService, ClassService, StatisticsService};
pub use storage::{JsonStore, Repository};

use storage::{FileBackend, KeyValueBackend, MemoryBackend, SqliteBackend};

/// Main backend struct that owns the store and all services
#[derive(Clone)]
pub struct Backend {
    pub repository: Repository,
    pub class_service: ClassService,
    pub attendance_service: AttendanceService,
    pub statistics_service: StatisticsService,
}

impl Backend {
    /// Wire every service to one store
    pub fn with_store(store: JsonStore) -> Self {
        let repository = Repository::new(store);
        Self {
            class_service: ClassService::new(repository.clone()),
            attendance_service: AttendanceService::new(repository.clone()),
            statistics_service: StatisticsService::new(repository.clone()),
            repository,
        }
    }

    /// Open the configured storage backend and build the services on top of it
    pub async fn initialize(config: &BackendConfig) -> Result<Self> {
        let backend: Arc<dyn KeyValueBackend> = match config.storage {
            StorageKind::File => Arc::new(
                FileBackend::new(&config.data_directory)
                    .await
                    .with_context(|| {
                        format!("Failed to open data directory {}", config.data_directory.display())
                    })?,
            ),
            StorageKind::Sqlite => {
                tokio::fs::create_dir_all(&config.data_directory)
                    .await
                    .with_context(|| {
                        format!("Failed to create data directory {}", config.data_directory.display())
                    })?;
                Arc::new(
                    SqliteBackend::in_directory(&config.data_directory)
                        .await
                        .context("Failed to open SQLite database")?,
                )
            }
            StorageKind::Memory => Arc::new(MemoryBackend::new()),
        };

        info!(
            "Using {} storage in {}",
            config.storage,
            config.data_directory.display()
        );

        let store = JsonStore::new(backend)
            .with_key_prefix(config.key_prefix.clone())
            .recover_corrupt_collections(config.recover_corrupt_collections);

        Ok(Self::with_store(store))
    }
}

/// Load configuration from the environment, start logging and open the backend
pub async fn initialize_backend() -> Result<Backend> {
    let config = BackendConfig::load().context("Failed to load configuration")?;
    logging::init_logging(&config.log_level);
    Backend::initialize(&config).await
}
