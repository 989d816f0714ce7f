pub mod error;
pub mod executor;
pub mod manager;
pub mod types;

pub use error::{Result, ToolHostError};
pub use executor::{describe_running_hosts, execute};
pub use manager::ToolHostManager;
pub use types::{RunState, ToolExecutionOutcome, ToolHostConfig, ToolHostStatus};
