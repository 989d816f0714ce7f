use crate::error::{Result, StorageError};
use crate::store::{now_secs, Store};
use rusqlite::{params, OptionalExtension};
use tracing::instrument;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MemoryEntryRow {
    pub id: String,
    pub session_id: Option<String>,
    pub category: String,
    pub key: String,
    pub value: String,
    pub confidence: f64,
    pub source: String,
    pub created_at: f64,
    pub last_accessed: f64,
    pub access_count: i64,
    pub target_time: Option<f64>,
    pub reminder_offset_minutes: Option<i64>,
    pub repeat_type: Option<String>,
    pub plan_status: Option<String>,
    pub snooze_until: Option<f64>,
}

/// Fields a caller may set when creating an entry; plan fields default to
/// `None` for ordinary facts/preferences (§4.D: only `category == "plan"`
/// entries populate them).
#[derive(Debug, Clone, Default)]
pub struct NewMemoryEntry {
    pub session_id: Option<String>,
    pub category: String,
    pub key: String,
    pub value: String,
    pub confidence: f64,
    pub source: String,
    pub target_time: Option<f64>,
    pub reminder_offset_minutes: Option<i64>,
    pub repeat_type: Option<String>,
    pub plan_status: Option<String>,
}

impl Store {
    #[instrument(skip(self, entry))]
    pub fn create_memory_entry(&self, entry: NewMemoryEntry) -> Result<MemoryEntryRow> {
        let conn = self.conn.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_secs();
        conn.execute(
            "INSERT INTO memory_entries
                (id, session_id, category, key, value, confidence, source, created_at, last_accessed,
                 access_count, target_time, reminder_offset_minutes, repeat_type, plan_status, snooze_until)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, 0, ?9, ?10, ?11, ?12, NULL)",
            params![
                id,
                entry.session_id,
                entry.category,
                entry.key,
                entry.value,
                entry.confidence,
                entry.source,
                now,
                entry.target_time,
                entry.reminder_offset_minutes,
                entry.repeat_type,
                entry.plan_status,
            ],
        )?;
        let rowid = conn.last_insert_rowid();
        sync_fts_insert(&conn, rowid, &entry.key, &entry.value)?;
        get_by_id(&conn, &id)?.ok_or(StorageError::NotFound(id))
    }

    #[instrument(skip(self))]
    pub fn get_memory_entry(&self, id: &str) -> Result<Option<MemoryEntryRow>> {
        let conn = self.conn.lock().unwrap();
        get_by_id(&conn, id)
    }

    #[instrument(skip(self, value))]
    pub fn update_memory_entry(
        &self,
        id: &str,
        value: Option<String>,
        confidence: Option<f64>,
        plan_status: Option<String>,
        snooze_until: Option<f64>,
    ) -> Result<MemoryEntryRow> {
        let conn = self.conn.lock().unwrap();
        let existing = get_by_id(&conn, id)?.ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        let rowid = rowid_of(&conn, id)?;
        // external-content FTS5 tables require the old row be deleted from
        // the index explicitly before the new text can be inserted.
        sync_fts_delete(&conn, rowid, &existing.key, &existing.value)?;

        let new_value = value.unwrap_or(existing.value);
        let new_confidence = confidence.unwrap_or(existing.confidence);
        let new_plan_status = plan_status.or(existing.plan_status);
        let new_snooze = snooze_until.or(existing.snooze_until);

        conn.execute(
            "UPDATE memory_entries SET value = ?2, confidence = ?3, plan_status = ?4, snooze_until = ?5
             WHERE id = ?1",
            params![id, new_value, new_confidence, new_plan_status, new_snooze],
        )?;
        sync_fts_insert(&conn, rowid, &existing.key, &new_value)?;
        get_by_id(&conn, id)?.ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub fn touch_memory_access(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE memory_entries SET last_accessed = ?2, access_count = access_count + 1 WHERE id = ?1",
            params![id, now_secs()],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn delete_memory_entry(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        if let Some(existing) = get_by_id(&conn, id)? {
            let rowid = rowid_of(&conn, id)?;
            sync_fts_delete(&conn, rowid, &existing.key, &existing.value)?;
        }
        conn.execute("DELETE FROM memory_entries WHERE id = ?1", params![id])?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn list_memory_entries(
        &self,
        session_id: Option<&str>,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryEntryRow>> {
        let conn = self.conn.lock().unwrap();
        let mut sql = String::from("SELECT * FROM memory_entries WHERE 1=1");
        let mut bindings: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(sid) = session_id {
            sql.push_str(" AND session_id = ?");
            bindings.push(Box::new(sid.to_string()));
        }
        if let Some(cat) = category {
            sql.push_str(" AND category = ?");
            bindings.push(Box::new(cat.to_string()));
        }
        sql.push_str(" ORDER BY last_accessed DESC LIMIT ?");
        bindings.push(Box::new(limit as i64));

        let mut stmt = conn.prepare(&sql)?;
        let params_ref: Vec<&dyn rusqlite::ToSql> = bindings.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(params_ref.as_slice(), row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Tier 1 retrieval: FTS5 prefix-OR match against the `key`/`value`
    /// columns. `terms` are already tokenized by the caller.
    #[instrument(skip(self, terms))]
    pub fn fts_prefix_search(&self, terms: &[String], limit: usize) -> Result<Vec<MemoryEntryRow>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let match_expr = terms
            .iter()
            .map(|t| format!("{}*", fts_escape(t)))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.fts_query(&match_expr, limit)
    }

    /// Tier 2 retrieval: FTS5 match against a caller-normalized query string
    /// (already pronoun-substituted / keyword-extracted).
    #[instrument(skip(self, normalized_query))]
    pub fn fts_match_search(&self, normalized_query: &str, limit: usize) -> Result<Vec<MemoryEntryRow>> {
        let terms: Vec<String> = normalized_query
            .split_whitespace()
            .map(|t| fts_escape(t))
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        self.fts_query(&terms.join(" OR "), limit)
    }

    fn fts_query(&self, match_expr: &str, limit: usize) -> Result<Vec<MemoryEntryRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT m.* FROM memory_fts f JOIN memory_entries m ON m.rowid = f.rowid
             WHERE memory_fts MATCH ?1 ORDER BY rank LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![match_expr, limit as i64], row_to_entry)
            .optional()
            .map(|opt| match opt {
                Some(mapped) => mapped.collect::<std::result::Result<Vec<_>, _>>(),
                None => Ok(Vec::new()),
            })??;
        Ok(rows)
    }

    /// Tier 3 retrieval: plain substring `LIKE` fallback when FTS finds
    /// nothing (handles punctuation/tokenization FTS5 can miss).
    #[instrument(skip(self))]
    pub fn like_search(&self, session_id: Option<&str>, substring: &str, limit: usize) -> Result<Vec<MemoryEntryRow>> {
        let conn = self.conn.lock().unwrap();
        let pattern = format!("%{}%", substring.replace('%', "\\%").replace('_', "\\_"));
        let mut stmt = conn.prepare(
            "SELECT * FROM memory_entries
             WHERE (session_id = ?1 OR ?1 IS NULL)
               AND (key LIKE ?2 ESCAPE '\\' OR value LIKE ?2 ESCAPE '\\')
             ORDER BY last_accessed DESC LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![session_id, pattern, limit as i64], row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Plans whose `target_time` has arrived (or passed) and are not
    /// snoozed past `now`, scoped to `plan_status = 'pending'`.
    #[instrument(skip(self))]
    pub fn get_due_plans(&self, session_id: Option<&str>, now: f64) -> Result<Vec<MemoryEntryRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM memory_entries
             WHERE category = 'plan' AND plan_status = 'pending'
               AND target_time IS NOT NULL
               AND target_time - (COALESCE(reminder_offset_minutes, 0) * 60) <= ?1
               AND (snooze_until IS NULL OR snooze_until <= ?1)
               AND (session_id = ?2 OR ?2 IS NULL)
             ORDER BY target_time ASC",
        )?;
        let rows = stmt
            .query_map(params![now, session_id], row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn rowid_of(conn: &rusqlite::Connection, id: &str) -> Result<i64> {
    Ok(conn.query_row("SELECT rowid FROM memory_entries WHERE id = ?1", params![id], |r| r.get(0))?)
}

fn get_by_id(conn: &rusqlite::Connection, id: &str) -> Result<Option<MemoryEntryRow>> {
    conn.query_row("SELECT * FROM memory_entries WHERE id = ?1", params![id], row_to_entry)
        .optional()
        .map_err(StorageError::from)
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<MemoryEntryRow> {
    Ok(MemoryEntryRow {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        category: row.get("category")?,
        key: row.get("key")?,
        value: row.get("value")?,
        confidence: row.get("confidence")?,
        source: row.get("source")?,
        created_at: row.get("created_at")?,
        last_accessed: row.get("last_accessed")?,
        access_count: row.get("access_count")?,
        target_time: row.get("target_time")?,
        reminder_offset_minutes: row.get("reminder_offset_minutes")?,
        repeat_type: row.get("repeat_type")?,
        plan_status: row.get("plan_status")?,
        snooze_until: row.get("snooze_until")?,
    })
}

fn sync_fts_insert(conn: &rusqlite::Connection, rowid: i64, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO memory_fts(rowid, key, value) VALUES (?1, ?2, ?3)",
        params![rowid, key, value],
    )?;
    Ok(())
}

fn sync_fts_delete(conn: &rusqlite::Connection, rowid: i64, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO memory_fts(memory_fts, rowid, key, value) VALUES ('delete', ?1, ?2, ?3)",
        params![rowid, key, value],
    )?;
    Ok(())
}

/// Strip FTS5 special characters so caller-supplied tokens never turn into
/// (or break) a MATCH query operator.
fn fts_escape(term: &str) -> String {
    let cleaned: String = term
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    format!("\"{}\"", cleaned.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_entry(key: &str, value: &str) -> NewMemoryEntry {
        NewMemoryEntry {
            session_id: Some("s1".into()),
            category: "fact".into(),
            key: key.into(),
            value: value.into(),
            confidence: 0.9,
            source: "user".into(),
            target_time: None,
            reminder_offset_minutes: None,
            repeat_type: None,
            plan_status: None,
        }
    }

    #[test]
    fn fts_prefix_search_finds_inserted_entry() {
        let store = Store::open_in_memory().unwrap();
        store.create_memory_entry(new_entry("favorite color", "blue")).unwrap();
        let results = store.fts_prefix_search(&["favorite".to_string()], 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, "blue");
    }

    #[test]
    fn update_resyncs_fts_index() {
        let store = Store::open_in_memory().unwrap();
        let row = store.create_memory_entry(new_entry("favorite color", "blue")).unwrap();
        store
            .update_memory_entry(&row.id, Some("green".to_string()), None, None, None)
            .unwrap();
        let by_old = store.fts_match_search("blue", 10).unwrap();
        assert!(by_old.is_empty());
        let by_new = store.fts_match_search("green", 10).unwrap();
        assert_eq!(by_new.len(), 1);
    }

    #[test]
    fn delete_removes_fts_entry() {
        let store = Store::open_in_memory().unwrap();
        let row = store.create_memory_entry(new_entry("favorite color", "blue")).unwrap();
        store.delete_memory_entry(&row.id).unwrap();
        let results = store.fts_match_search("blue", 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn get_due_plans_filters_by_target_time_and_snooze() {
        let store = Store::open_in_memory().unwrap();
        let mut plan = new_entry("reminder", "call dentist");
        plan.category = "plan".to_string();
        plan.plan_status = Some("pending".to_string());
        plan.target_time = Some(100.0);
        let row = store.create_memory_entry(plan).unwrap();

        let due = store.get_due_plans(Some("s1"), 200.0).unwrap();
        assert_eq!(due.len(), 1);

        store
            .update_memory_entry(&row.id, None, None, None, Some(500.0))
            .unwrap();
        let due_after_snooze = store.get_due_plans(Some("s1"), 200.0).unwrap();
        assert!(due_after_snooze.is_empty());
    }
}
