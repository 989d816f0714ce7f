use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntentError {
    #[error("invalid rule pattern {pattern:?}: {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("layer-2 classifier call failed: {0}")]
    Llm(#[from] noetic_llm::LlmError),

    #[error("layer-2 classifier returned unparseable output: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, IntentError>;
