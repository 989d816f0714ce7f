use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("storage error: {0}")]
    Storage(#[from] noetic_storage::StorageError),

    #[error("memory error: {0}")]
    Memory(#[from] noetic_memory::MemoryError),

    #[error("request expired or not found")]
    ExpiredOrNotFound,

    #[error("session mismatch")]
    SessionMismatch,

    #[error("missing required field {0:?}")]
    MissingField(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FormError>;
