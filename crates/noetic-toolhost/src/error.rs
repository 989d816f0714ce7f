use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolHostError {
    #[error("storage error: {0}")]
    Storage(#[from] noetic_storage::StorageError),

    #[error("no tool host named {0:?}")]
    NotFound(String),

    #[error("a tool host named {0:?} is already registered")]
    AlreadyExists(String),

    #[error("tool host {0:?} is not running")]
    NotRunning(String),

    #[error("failed to spawn tool host {name:?}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ToolHostError>;
