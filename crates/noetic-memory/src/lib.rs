pub mod entries;
pub mod error;
pub mod plans;
pub mod retrieval;
pub mod tokenize;
pub mod working_memory;

pub use error::{MemoryError, Result};
pub use plans::NewPlan;
pub use retrieval::{retrieve, ScoredMemory, DEFAULT_CANDIDATE_CEILING, DEFAULT_RECALL_LIMIT};
pub use working_memory::WorkingMemoryUpdate;
