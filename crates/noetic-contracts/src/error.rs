use crate::ExecutionStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("invalid transition: trigger {trigger:?} is not valid from status {from:?}")]
    InvalidTransition {
        trigger: String,
        from: ExecutionStatus,
    },
}

pub type Result<T> = std::result::Result<T, ContractError>;
