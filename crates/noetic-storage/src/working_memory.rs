use crate::error::Result;
use crate::store::{now_secs, Store};
use rusqlite::{params, OptionalExtension};
use serde_json::{Map, Value};
use tracing::{instrument, warn};

/// Serialized `context_variables` must stay within this bound (§3 invariant).
pub const CONTEXT_VARIABLES_CAP_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WorkingMemoryRow {
    pub session_id: String,
    pub current_topic: Option<String>,
    /// `{ key: { "value": ..., "timestamp": f64 } }` — the timestamp lets
    /// eviction pick the oldest entries first.
    pub context_variables: Map<String, Value>,
    pub turn_count: i64,
    pub last_emotion: Option<String>,
    pub created_at: f64,
    pub updated_at: f64,
}

impl Store {
    #[instrument(skip(self))]
    pub fn get_or_create_working_memory(&self, session_id: &str) -> Result<WorkingMemoryRow> {
        let conn = self.conn.lock().unwrap();
        let now = now_secs();
        conn.execute(
            "INSERT OR IGNORE INTO working_memory
                (session_id, current_topic, context_variables, turn_count, last_emotion, created_at, updated_at)
             VALUES (?1, NULL, '{}', 0, NULL, ?2, ?2)",
            params![session_id, now],
        )?;
        row_from_db(&conn, session_id)?.ok_or_else(|| crate::error::StorageError::NotFound(session_id.to_string()))
    }

    #[instrument(skip(self))]
    pub fn get_working_memory(&self, session_id: &str) -> Result<Option<WorkingMemoryRow>> {
        let conn = self.conn.lock().unwrap();
        row_from_db(&conn, session_id)
    }

    /// Update working memory. `new_variable` is merged into
    /// `context_variables` (stamped with the current time), evicting the
    /// oldest other entries until the serialized size fits within
    /// `CONTEXT_VARIABLES_CAP_BYTES` (§3, §4.D).
    #[instrument(skip(self, new_variable))]
    pub fn update_working_memory(
        &self,
        session_id: &str,
        current_topic: Option<String>,
        new_variable: Option<(String, Value)>,
        last_emotion: Option<String>,
        increment_turn: bool,
    ) -> Result<WorkingMemoryRow> {
        let conn = self.conn.lock().unwrap();
        let now = now_secs();
        conn.execute(
            "INSERT OR IGNORE INTO working_memory
                (session_id, current_topic, context_variables, turn_count, last_emotion, created_at, updated_at)
             VALUES (?1, NULL, '{}', 0, NULL, ?2, ?2)",
            params![session_id, now],
        )?;

        let mut row = row_from_db(&conn, session_id)?
            .ok_or_else(|| crate::error::StorageError::NotFound(session_id.to_string()))?;

        if let Some(topic) = current_topic {
            row.current_topic = Some(topic);
        }
        if let Some(emotion) = last_emotion {
            row.last_emotion = Some(emotion);
        }
        if increment_turn {
            row.turn_count += 1;
        }
        if let Some((key, value)) = new_variable {
            row.context_variables.insert(
                key.clone(),
                serde_json::json!({"value": value, "timestamp": now}),
            );
            evict_until_fits(&mut row.context_variables, &key);
        }

        let serialized = serde_json::to_string(&row.context_variables)?;
        conn.execute(
            "UPDATE working_memory
             SET current_topic = ?2, context_variables = ?3, turn_count = ?4, last_emotion = ?5, updated_at = ?6
             WHERE session_id = ?1",
            params![
                session_id,
                row.current_topic,
                serialized,
                row.turn_count,
                row.last_emotion,
                now
            ],
        )?;
        row.updated_at = now;
        Ok(row)
    }

    #[instrument(skip(self))]
    pub fn delete_working_memory(&self, session_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM working_memory WHERE session_id = ?1", params![session_id])?;
        Ok(())
    }

    /// Remove working memory rows untouched for `inactivity_minutes`.
    #[instrument(skip(self))]
    pub fn cleanup_expired_working_memory(&self, inactivity_minutes: f64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let cutoff = now_secs() - inactivity_minutes * 60.0;
        let n = conn.execute("DELETE FROM working_memory WHERE updated_at < ?1", params![cutoff])?;
        Ok(n)
    }
}

fn row_from_db(conn: &rusqlite::Connection, session_id: &str) -> Result<Option<WorkingMemoryRow>> {
    conn.query_row(
        "SELECT session_id, current_topic, context_variables, turn_count, last_emotion, created_at, updated_at
         FROM working_memory WHERE session_id = ?1",
        params![session_id],
        |row| {
            let vars_str: String = row.get(2)?;
            Ok((row, vars_str))
        },
    )
    .optional()?
    .map(|(row, vars_str)| {
        let context_variables: Map<String, Value> = serde_json::from_str(&vars_str).unwrap_or_default();
        Ok(WorkingMemoryRow {
            session_id: row.get(0)?,
            current_topic: row.get(1)?,
            context_variables,
            turn_count: row.get(3)?,
            last_emotion: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    })
    .transpose()
}

/// Evict entries with the oldest `timestamp`, except `just_written`, until
/// the serialized map fits within the cap. Logs at `warn!` when triggered
/// (§7: working memory cap is an ambient-logging requirement, not just an
/// invariant).
fn evict_until_fits(vars: &mut Map<String, Value>, just_written: &str) {
    loop {
        let size = serde_json::to_string(vars).map(|s| s.len()).unwrap_or(0);
        if size <= CONTEXT_VARIABLES_CAP_BYTES {
            return;
        }
        let oldest_key = vars
            .iter()
            .filter(|(k, _)| k.as_str() != just_written)
            .min_by(|(_, a), (_, b)| {
                let ta = a.get("timestamp").and_then(Value::as_f64).unwrap_or(0.0);
                let tb = b.get("timestamp").and_then(Value::as_f64).unwrap_or(0.0);
                ta.partial_cmp(&tb).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(k, _)| k.clone());

        match oldest_key {
            Some(key) => {
                warn!(key, "working_memory: evicting oldest context variable to stay within cap");
                vars.remove(&key);
            }
            None => return, // only `just_written` remains; nothing more to evict
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_keeps_new_entry_under_cap() {
        let mut vars = Map::new();
        // Pack the map with old entries close to the cap.
        for i in 0..2000 {
            vars.insert(
                format!("k{i}"),
                serde_json::json!({"value": "x".repeat(30), "timestamp": i as f64}),
            );
        }
        let before = serde_json::to_string(&vars).unwrap().len();
        assert!(before > CONTEXT_VARIABLES_CAP_BYTES);

        vars.insert("new".to_string(), serde_json::json!({"value": "fresh", "timestamp": 99999.0}));
        evict_until_fits(&mut vars, "new");

        let after = serde_json::to_string(&vars).unwrap().len();
        assert!(after <= CONTEXT_VARIABLES_CAP_BYTES);
        assert!(vars.contains_key("new"), "the just-written entry must never be evicted");
    }
}
