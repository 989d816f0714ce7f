use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error(transparent)]
    Storage(#[from] noetic_storage::StorageError),
    #[error("plan {0} not found")]
    PlanNotFound(String),
    #[error("plan {0} is not pending")]
    PlanNotPending(String),
}

pub type Result<T> = std::result::Result<T, MemoryError>;
