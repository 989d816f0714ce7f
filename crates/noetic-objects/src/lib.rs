pub mod error;
pub mod registry;
pub mod types;

pub use error::{ObjectsError, Result};
pub use registry::CoRegistry;
pub use types::{CognitiveObject, CognitiveObjectStatus, TransitionRecord};
