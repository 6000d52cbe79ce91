use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use crate::store::{ClusterStore, SavedClusterState, SessionKey, StoreError};

/// Cluster documents kept in a single SQLite table, one row per session.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new in-memory database
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cluster_states (
                session_id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Ids of every stored session, sorted
    pub fn session_ids(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut stmt = conn.prepare("SELECT session_id FROM cluster_states ORDER BY session_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}

impl ClusterStore for SqliteStore {
    fn load(&self, session_id: &str) -> Result<Option<SavedClusterState>, StoreError> {
        let key = SessionKey::sanitize(session_id)?;
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;

        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM cluster_states WHERE session_id = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        document
            .map(|json| SavedClusterState::from_json(&json))
            .transpose()
    }

    fn save(&self, session_id: &str, state: &SavedClusterState) -> Result<(), StoreError> {
        let key = SessionKey::sanitize(session_id)?;
        let document = state.to_json()?;
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;

        conn.execute(
            "INSERT OR REPLACE INTO cluster_states (session_id, document, updated_at) VALUES (?1, ?2, ?3)",
            params![key, document, state.updated_at.to_rfc3339()],
        )?;
        Ok(())
    }
}
