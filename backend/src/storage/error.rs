use thiserror::Error;

/// Failure reported by a key-value backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("backend unavailable for key `{key}`")]
    Unavailable { key: String },
}

/// Failure reading or writing a JSON collection
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failed for key `{key}`")]
    Backend {
        key: String,
        #[source]
        source: BackendError,
    },
    #[error("collection `{key}` holds data that is not valid JSON for its type")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode collection `{key}`")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The kind of entity a lookup was for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Class,
    AttendanceRecord,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Class => write!(f, "class"),
            Entity::AttendanceRecord => write!(f, "attendance record"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{entity} `{id}` not found")]
    NotFound { entity: Entity, id: String },
    #[error(transparent)]
    Storage(#[from] StoreError),
    /// The attendance records of a class were removed but the class itself
    /// could not be, and the records could not be put back.
    #[error("class `{class_id}` kept after its attendance records were removed")]
    PartialCascade {
        class_id: String,
        #[source]
        source: StoreError,
    },
}

impl RepositoryError {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        RepositoryError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}
