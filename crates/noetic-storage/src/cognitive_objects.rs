use crate::error::{Result, StorageError};
use crate::store::{now_secs, Store};
use rusqlite::{params, OptionalExtension};
use tracing::instrument;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CognitiveObjectRow {
    pub co_id: String,
    pub title: String,
    pub description: String,
    pub semantic_type: Option<String>,
    pub domain_tag: Option<String>,
    pub intent_category: Option<String>,
    pub status: String,
    /// JSON array of `{from, to, at, trigger}` transition records.
    pub transitions: String,
    pub external_references: String,
    pub related_co_ids: String,
    pub linked_memory_ids: String,
    pub created_by: String,
    pub conversation_id: Option<String>,
    pub creation_context: Option<String>,
    pub created_at: f64,
    pub updated_at: f64,
    /// Populated from `co_execution_links`, not a real column — mirrors
    /// `cognitive_object.py`'s `get()` join-on-read behavior.
    pub linked_execution_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewCognitiveObject {
    pub title: String,
    pub description: String,
    pub semantic_type: Option<String>,
    pub domain_tag: Option<String>,
    pub intent_category: Option<String>,
    pub created_by: String,
    pub conversation_id: Option<String>,
    pub creation_context: Option<String>,
}

impl Store {
    #[instrument(skip(self, new))]
    pub fn create_cognitive_object(&self, new: NewCognitiveObject) -> Result<CognitiveObjectRow> {
        let conn = self.conn.lock().unwrap();
        let co_id = uuid::Uuid::new_v4().to_string();
        let now = now_secs();
        conn.execute(
            "INSERT INTO cognitive_objects
                (co_id, title, description, semantic_type, domain_tag, intent_category, status,
                 transitions, external_references, related_co_ids, linked_memory_ids,
                 created_by, conversation_id, creation_context, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'emerging', '[]', '[]', '[]', '[]', ?7, ?8, ?9, ?10, ?10)",
            params![
                co_id,
                new.title,
                new.description,
                new.semantic_type,
                new.domain_tag,
                new.intent_category,
                new.created_by,
                new.conversation_id,
                new.creation_context,
                now,
            ],
        )?;
        get_with_links(&conn, &co_id)?.ok_or(StorageError::NotFound(co_id))
    }

    #[instrument(skip(self))]
    pub fn get_cognitive_object(&self, co_id: &str) -> Result<Option<CognitiveObjectRow>> {
        let conn = self.conn.lock().unwrap();
        get_with_links(&conn, co_id)
    }

    #[instrument(skip(self))]
    pub fn list_active_cognitive_objects(&self, limit: usize) -> Result<Vec<CognitiveObjectRow>> {
        self.list_by_status_multi(&["emerging", "active", "waiting", "blocked"], limit)
    }

    #[instrument(skip(self))]
    pub fn list_cognitive_objects_by_status(&self, status: &str, limit: usize) -> Result<Vec<CognitiveObjectRow>> {
        self.list_by_status_multi(&[status], limit)
    }

    fn list_by_status_multi(&self, statuses: &[&str], limit: usize) -> Result<Vec<CognitiveObjectRow>> {
        let conn = self.conn.lock().unwrap();
        let placeholders = statuses.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT co_id FROM cognitive_objects WHERE status IN ({placeholders}) ORDER BY updated_at DESC LIMIT ?"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut bindings: Vec<&dyn rusqlite::ToSql> = statuses.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
        let limit_i64 = limit as i64;
        bindings.push(&limit_i64);
        let ids: Vec<String> = stmt
            .query_map(bindings.as_slice(), |r| r.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        ids.into_iter()
            .map(|id| get_with_links(&conn, &id)?.ok_or_else(|| StorageError::NotFound(id.clone())))
            .collect()
    }

    /// Append a transition record and persist `{status, transitions,
    /// updated_at}` atomically — mirrors `CORegistry.transition()`'s
    /// single-`UPDATE` write.
    #[instrument(skip(self))]
    pub fn transition_cognitive_object(
        &self,
        co_id: &str,
        new_status: &str,
        trigger: &str,
        actor: &str,
        reason: Option<&str>,
    ) -> Result<CognitiveObjectRow> {
        let conn = self.conn.lock().unwrap();
        let existing = get_with_links(&conn, co_id)?.ok_or_else(|| StorageError::NotFound(co_id.to_string()))?;
        let now = now_secs();
        let mut transitions: Vec<serde_json::Value> = serde_json::from_str(&existing.transitions)?;
        transitions.push(serde_json::json!({
            "from": existing.status,
            "to": new_status,
            "trigger": trigger,
            "actor": actor,
            "reason": reason,
            "at": now,
        }));
        let transitions_json = serde_json::to_string(&transitions)?;
        conn.execute(
            "UPDATE cognitive_objects SET status = ?2, transitions = ?3, updated_at = ?4 WHERE co_id = ?1",
            params![co_id, new_status, transitions_json, now],
        )?;
        get_with_links(&conn, co_id)?.ok_or_else(|| StorageError::NotFound(co_id.to_string()))
    }

    #[instrument(skip(self))]
    pub fn link_execution(&self, co_id: &str, execution_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO co_execution_links (co_id, execution_id, linked_at) VALUES (?1, ?2, ?3)",
            params![co_id, execution_id, now_secs()],
        )?;
        conn.execute(
            "UPDATE cognitive_objects SET updated_at = ?2 WHERE co_id = ?1",
            params![co_id, now_secs()],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn link_memory(&self, co_id: &str, memory_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let existing = get_with_links(&conn, co_id)?.ok_or_else(|| StorageError::NotFound(co_id.to_string()))?;
        let mut linked: Vec<String> = serde_json::from_str(&existing.linked_memory_ids)?;
        if !linked.contains(&memory_id.to_string()) {
            linked.push(memory_id.to_string());
        }
        conn.execute(
            "UPDATE cognitive_objects SET linked_memory_ids = ?2, updated_at = ?3 WHERE co_id = ?1",
            params![co_id, serde_json::to_string(&linked)?, now_secs()],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn update_cognitive_object_metadata(
        &self,
        co_id: &str,
        description: Option<String>,
        domain_tag: Option<String>,
    ) -> Result<CognitiveObjectRow> {
        let conn = self.conn.lock().unwrap();
        let existing = get_with_links(&conn, co_id)?.ok_or_else(|| StorageError::NotFound(co_id.to_string()))?;
        conn.execute(
            "UPDATE cognitive_objects SET description = ?2, domain_tag = ?3, updated_at = ?4 WHERE co_id = ?1",
            params![
                co_id,
                description.unwrap_or(existing.description),
                domain_tag.or(existing.domain_tag),
                now_secs(),
            ],
        )?;
        get_with_links(&conn, co_id)?.ok_or_else(|| StorageError::NotFound(co_id.to_string()))
    }

    /// Substring search over title/description, scoped to active statuses.
    #[instrument(skip(self))]
    pub fn search_cognitive_objects(&self, query: &str, limit: usize) -> Result<Vec<CognitiveObjectRow>> {
        let conn = self.conn.lock().unwrap();
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let mut stmt = conn.prepare(
            "SELECT co_id FROM cognitive_objects
             WHERE (title LIKE ?1 ESCAPE '\\' OR description LIKE ?1 ESCAPE '\\')
             ORDER BY updated_at DESC LIMIT ?2",
        )?;
        let ids: Vec<String> = stmt
            .query_map(params![pattern, limit as i64], |r| r.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        ids.into_iter()
            .map(|id| get_with_links(&conn, &id)?.ok_or_else(|| StorageError::NotFound(id.clone())))
            .collect()
    }
}

fn get_with_links(conn: &rusqlite::Connection, co_id: &str) -> Result<Option<CognitiveObjectRow>> {
    let base = conn
        .query_row(
            "SELECT * FROM cognitive_objects WHERE co_id = ?1",
            params![co_id],
            row_to_co,
        )
        .optional()?;
    let Some(mut row) = base else { return Ok(None) };

    let mut stmt = conn.prepare("SELECT execution_id FROM co_execution_links WHERE co_id = ?1 ORDER BY linked_at ASC")?;
    row.linked_execution_ids = stmt
        .query_map(params![co_id], |r| r.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Some(row))
}

fn row_to_co(row: &rusqlite::Row) -> rusqlite::Result<CognitiveObjectRow> {
    Ok(CognitiveObjectRow {
        co_id: row.get("co_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        semantic_type: row.get("semantic_type")?,
        domain_tag: row.get("domain_tag")?,
        intent_category: row.get("intent_category")?,
        status: row.get("status")?,
        transitions: row.get("transitions")?,
        external_references: row.get("external_references")?,
        related_co_ids: row.get("related_co_ids")?,
        linked_memory_ids: row.get("linked_memory_ids")?,
        created_by: row.get("created_by")?,
        conversation_id: row.get("conversation_id")?,
        creation_context: row.get("creation_context")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        linked_execution_ids: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_co() -> NewCognitiveObject {
        NewCognitiveObject {
            title: "plan the trip".into(),
            description: "".into(),
            semantic_type: Some("goal".into()),
            domain_tag: None,
            intent_category: None,
            created_by: "user".into(),
            conversation_id: Some("s1".into()),
            creation_context: None,
        }
    }

    #[test]
    fn create_starts_in_emerging_status() {
        let store = Store::open_in_memory().unwrap();
        let co = store.create_cognitive_object(new_co()).unwrap();
        assert_eq!(co.status, "emerging");
        assert!(co.linked_execution_ids.is_empty());
    }

    #[test]
    fn transition_appends_record_and_updates_status() {
        let store = Store::open_in_memory().unwrap();
        let co = store.create_cognitive_object(new_co()).unwrap();
        let updated = store
            .transition_cognitive_object(&co.co_id, "active", "begin_work", "user", None)
            .unwrap();
        assert_eq!(updated.status, "active");
        let transitions: Vec<serde_json::Value> = serde_json::from_str(&updated.transitions).unwrap();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0]["trigger"], "begin_work");
    }

    #[test]
    fn link_execution_is_visible_on_get() {
        let store = Store::open_in_memory().unwrap();
        let co = store.create_cognitive_object(new_co()).unwrap();
        store.link_execution(&co.co_id, "exec-1").unwrap();
        let fetched = store.get_cognitive_object(&co.co_id).unwrap().unwrap();
        assert_eq!(fetched.linked_execution_ids, vec!["exec-1".to_string()]);
    }
}
