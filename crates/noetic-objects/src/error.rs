use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectsError {
    #[error(transparent)]
    Storage(#[from] noetic_storage::StorageError),

    #[error("invalid cognitive object transition: {trigger} from {from}")]
    InvalidTransition { trigger: String, from: String },
}

pub type Result<T> = std::result::Result<T, ObjectsError>;
