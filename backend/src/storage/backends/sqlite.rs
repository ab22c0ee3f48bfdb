use async_trait::async_trait;
use log::info;
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};
use std::path::Path;
use std::sync::Arc;

use crate::storage::error::BackendError;
use crate::storage::traits::KeyValueBackend;

/// File name of the database inside the data directory
pub const DATABASE_FILE: &str = "rollytics.db";

/// Key-value backend over a single SQLite table
#[derive(Clone)]
pub struct SqliteBackend {
    pool: Arc<SqlitePool>,
}

impl SqliteBackend {
    /// Open (creating if necessary) the database at `url`
    pub async fn new(url: &str) -> Result<Self, BackendError> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?;
            info!("Created SQLite database: {}", url);
        }

        let pool = SqlitePool::connect(url).await?;
        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Open the database file inside a data directory
    pub async fn in_directory<P: AsRef<Path>>(data_directory: P) -> Result<Self, BackendError> {
        let path = data_directory.as_ref().join(DATABASE_FILE);
        Self::new(&format!("sqlite:{}", path.display())).await
    }

    /// Open a private in-memory database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self, BackendError> {
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    async fn setup_schema(pool: &SqlitePool) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS key_values (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for SqliteBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let row = sqlx::query("SELECT value FROM key_values WHERE key = ?")
            .bind(key)
            .fetch_optional(&*self.pool)
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        sqlx::query("INSERT OR REPLACE INTO key_values (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }
}
