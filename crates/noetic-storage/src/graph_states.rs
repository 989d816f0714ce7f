use crate::error::Result;
use crate::store::{now_secs, Store};
use rusqlite::{params, OptionalExtension};
use tracing::instrument;

/// `GraphState` is owned and (de)serialized by `noetic-graph`; this crate
/// only persists and retrieves the opaque blob so a suspended turn (waiting
/// on an external-step response, or across a process restart) can resume
/// (§3, §4.K).
impl Store {
    #[instrument(skip(self, state_json))]
    pub fn save_graph_state(&self, session_id: &str, state_json: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO graph_states (session_id, state, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
            params![session_id, state_json, now_secs()],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn load_graph_state(&self, session_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT state FROM graph_states WHERE session_id = ?1",
                params![session_id],
                |r| r.get(0),
            )
            .optional()?)
    }

    #[instrument(skip(self))]
    pub fn delete_graph_state(&self, session_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM graph_states WHERE session_id = ?1", params![session_id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_roundtrips() {
        let store = Store::open_in_memory().unwrap();
        store.get_or_create_session("s1").unwrap();
        store.save_graph_state("s1", r#"{"foo":1}"#).unwrap();
        assert_eq!(store.load_graph_state("s1").unwrap(), Some(r#"{"foo":1}"#.to_string()));
    }

    #[test]
    fn save_overwrites_prior_state() {
        let store = Store::open_in_memory().unwrap();
        store.get_or_create_session("s1").unwrap();
        store.save_graph_state("s1", "first").unwrap();
        store.save_graph_state("s1", "second").unwrap();
        assert_eq!(store.load_graph_state("s1").unwrap(), Some("second".to_string()));
    }

    #[test]
    fn delete_clears_state() {
        let store = Store::open_in_memory().unwrap();
        store.get_or_create_session("s1").unwrap();
        store.save_graph_state("s1", "x").unwrap();
        store.delete_graph_state("s1").unwrap();
        assert_eq!(store.load_graph_state("s1").unwrap(), None);
    }
}
