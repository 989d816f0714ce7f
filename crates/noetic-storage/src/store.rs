use crate::error::Result;
use rusqlite::Connection;
use std::sync::Mutex;
use tracing::info;

/// The durable relational store (§4.A). One `Connection` behind a mutex —
/// SQLite serializes writes at the connection level regardless, so this
/// mirrors `skynet-memory::MemoryManager`'s and `skynet-sessions::
/// SessionManager`'s single-connection-behind-a-mutex ownership rather than
/// reaching for a pool this workload doesn't need.
pub struct Store {
    pub(crate) conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path` and ensure schema.
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        info!(path, "storage: opened database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database — used by tests across the workspace.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    title TEXT,
    created_at REAL NOT NULL,
    updated_at REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, created_at);

CREATE TABLE IF NOT EXISTS working_memory (
    session_id TEXT PRIMARY KEY REFERENCES sessions(id) ON DELETE CASCADE,
    current_topic TEXT,
    context_variables TEXT NOT NULL DEFAULT '{}',
    turn_count INTEGER NOT NULL DEFAULT 0,
    last_emotion TEXT,
    created_at REAL NOT NULL,
    updated_at REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS memory_entries (
    id TEXT PRIMARY KEY,
    session_id TEXT,
    category TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    confidence REAL NOT NULL,
    source TEXT NOT NULL,
    created_at REAL NOT NULL,
    last_accessed REAL NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    target_time REAL,
    reminder_offset_minutes INTEGER,
    repeat_type TEXT,
    plan_status TEXT,
    snooze_until REAL
);
CREATE INDEX IF NOT EXISTS idx_memory_category ON memory_entries(category);
CREATE INDEX IF NOT EXISTS idx_memory_session ON memory_entries(session_id);

CREATE VIRTUAL TABLE IF NOT EXISTS memory_fts USING fts5(
    key, value, content='memory_entries', content_rowid='rowid'
);

CREATE TABLE IF NOT EXISTS cognitive_objects (
    co_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    semantic_type TEXT,
    domain_tag TEXT,
    intent_category TEXT,
    status TEXT NOT NULL,
    transitions TEXT NOT NULL DEFAULT '[]',
    external_references TEXT NOT NULL DEFAULT '[]',
    related_co_ids TEXT NOT NULL DEFAULT '[]',
    linked_memory_ids TEXT NOT NULL DEFAULT '[]',
    created_by TEXT NOT NULL,
    conversation_id TEXT,
    creation_context TEXT,
    created_at REAL NOT NULL,
    updated_at REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_co_status ON cognitive_objects(status);

CREATE TABLE IF NOT EXISTS co_execution_links (
    co_id TEXT NOT NULL REFERENCES cognitive_objects(co_id) ON DELETE CASCADE,
    execution_id TEXT NOT NULL,
    linked_at REAL NOT NULL,
    PRIMARY KEY (co_id, execution_id)
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS graph_states (
    session_id TEXT PRIMARY KEY REFERENCES sessions(id) ON DELETE CASCADE,
    state TEXT NOT NULL,
    updated_at REAL NOT NULL
);
"#;

pub(crate) fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
