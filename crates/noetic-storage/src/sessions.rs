use crate::error::{Result, StorageError};
use crate::store::{now_secs, Store};
use rusqlite::params;
use tracing::instrument;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub title: Option<String>,
    pub created_at: f64,
    pub updated_at: f64,
}

impl Store {
    /// Create the session row if it does not already exist, then return it —
    /// the `INSERT OR IGNORE` + read-back race-safe pattern used by
    /// `skynet-sessions::manager::SessionManager::get_or_create`.
    #[instrument(skip(self))]
    pub fn get_or_create_session(&self, id: &str) -> Result<SessionRow> {
        let conn = self.conn.lock().unwrap();
        let now = now_secs();
        conn.execute(
            "INSERT OR IGNORE INTO sessions (id, title, created_at, updated_at) VALUES (?1, NULL, ?2, ?2)",
            params![id, now],
        )?;
        conn.query_row(
            "SELECT id, title, created_at, updated_at FROM sessions WHERE id = ?1",
            params![id],
            |row| {
                Ok(SessionRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            },
        )
        .map_err(StorageError::from)
    }

    #[instrument(skip(self))]
    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, title, created_at, updated_at FROM sessions WHERE id = ?1",
            params![id],
            |row| {
                Ok(SessionRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            },
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            e => Err(StorageError::from(e)),
        })
    }

    #[instrument(skip(self))]
    pub fn touch_session(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sessions SET updated_at = ?2 WHERE id = ?1",
            params![id, now_secs()],
        )?;
        Ok(())
    }

    /// Delete a session; cascades to messages and working memory via FK.
    #[instrument(skip(self))]
    pub fn delete_session(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(())
    }
}
