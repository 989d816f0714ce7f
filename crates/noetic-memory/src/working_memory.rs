//! Working memory (§4.D "Working memory"): a read-through cache on session id.

use crate::error::Result;
use noetic_storage::{Store, WorkingMemoryRow};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct WorkingMemoryUpdate {
    pub current_topic: Option<String>,
    pub new_variable: Option<(String, Value)>,
    pub last_emotion: Option<String>,
    pub increment_turn: bool,
}

/// Ensures the owning session exists first — `working_memory.session_id` is
/// a foreign key to `sessions.id`, and the source auto-creates a session on
/// first touch rather than requiring the caller to do it up front.
pub fn get_or_create(store: &Store, session_id: &str) -> Result<WorkingMemoryRow> {
    store.get_or_create_session(session_id)?;
    Ok(store.get_or_create_working_memory(session_id)?)
}

pub fn get(store: &Store, session_id: &str) -> Result<Option<WorkingMemoryRow>> {
    Ok(store.get_working_memory(session_id)?)
}

pub fn update(store: &Store, session_id: &str, update: WorkingMemoryUpdate) -> Result<WorkingMemoryRow> {
    store.get_or_create_session(session_id)?;
    Ok(store.update_working_memory(
        session_id,
        update.current_topic,
        update.new_variable,
        update.last_emotion,
        update.increment_turn,
    )?)
}

pub fn delete(store: &Store, session_id: &str) -> Result<()> {
    Ok(store.delete_working_memory(session_id)?)
}

pub fn cleanup_expired(store: &Store, inactivity_minutes: f64) -> Result<usize> {
    Ok(store.cleanup_expired_working_memory(inactivity_minutes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_auto_creates_owning_session() {
        let store = Store::open_in_memory().unwrap();
        let wm = get_or_create(&store, "s1").unwrap();
        assert_eq!(wm.session_id, "s1");
        assert_eq!(wm.turn_count, 0);
    }

    #[test]
    fn update_increments_turn_and_sets_topic() {
        let store = Store::open_in_memory().unwrap();
        get_or_create(&store, "s1").unwrap();
        let wm = update(
            &store,
            "s1",
            WorkingMemoryUpdate {
                current_topic: Some("travel".to_string()),
                increment_turn: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(wm.turn_count, 1);
        assert_eq!(wm.current_topic.as_deref(), Some("travel"));
    }
}
