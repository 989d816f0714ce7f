use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("storage error: {0}")]
    Storage(#[from] noetic_storage::StorageError),

    #[error("memory error: {0}")]
    Memory(#[from] noetic_memory::MemoryError),

    #[error("intent error: {0}")]
    Intent(#[from] noetic_intent::IntentError),

    #[error("tool host error: {0}")]
    ToolHost(#[from] noetic_toolhost::ToolHostError),

    #[error("forms error: {0}")]
    Forms(#[from] noetic_forms::FormError),

    #[error("contract error: {0}")]
    Contract(#[from] noetic_contracts::ContractError),

    #[error("llm error: {0}")]
    Llm(#[from] noetic_llm::LlmError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("outer loop bound ({0}) exceeded")]
    OuterLoopExceeded(u32),

    #[error("inner loop bound ({0}) exceeded")]
    InnerLoopExceeded(u32),

    #[error("persistence failed, turn aborted: {0}")]
    ObserverPersist(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;
