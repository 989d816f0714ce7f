use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("no model configured")]
    NotConfigured,

    #[error("could not parse provider response: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;
