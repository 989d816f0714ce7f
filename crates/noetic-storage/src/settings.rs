use crate::error::Result;
use crate::store::Store;
use rusqlite::{params, OptionalExtension};
use tracing::instrument;

/// Flat key/value store used for small bits of mutable configuration that
/// don't warrant their own table — the tool-host registry (key
/// `"tool_hosts"`) is the primary consumer.
impl Store {
    #[instrument(skip(self))]
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row("SELECT value FROM settings WHERE key = ?1", params![key], |r| r.get(0))
            .optional()?)
    }

    #[instrument(skip(self, value))]
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn delete_setting(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let store = Store::open_in_memory().unwrap();
        store.set_setting("tool_hosts", "[]").unwrap();
        assert_eq!(store.get_setting("tool_hosts").unwrap(), Some("[]".to_string()));
    }

    #[test]
    fn set_overwrites_existing_value() {
        let store = Store::open_in_memory().unwrap();
        store.set_setting("k", "1").unwrap();
        store.set_setting("k", "2").unwrap();
        assert_eq!(store.get_setting("k").unwrap(), Some("2".to_string()));
    }

    #[test]
    fn missing_key_returns_none() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.get_setting("absent").unwrap(), None);
    }
}
