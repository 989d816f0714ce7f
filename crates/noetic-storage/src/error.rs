use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("size limit exceeded: {size} bytes (max {max})")]
    SizeLimitExceeded { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, StorageError>;
