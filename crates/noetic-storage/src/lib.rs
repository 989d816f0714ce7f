pub mod cognitive_objects;
pub mod error;
pub mod graph_states;
pub mod memory_entries;
pub mod messages;
pub mod sessions;
pub mod settings;
pub mod store;
pub mod working_memory;

pub use cognitive_objects::{CognitiveObjectRow, NewCognitiveObject};
pub use error::{Result, StorageError};
pub use memory_entries::{MemoryEntryRow, NewMemoryEntry};
pub use messages::{MessageRole, MessageRow};
pub use sessions::SessionRow;
pub use store::Store;
pub use working_memory::WorkingMemoryRow;
