use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use tokio::task::spawn_blocking;

use super::{SessionItem, SessionStore};
use crate::error::{Error, Result};

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS agent_sessions (
    session_id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS agent_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    message_data TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (session_id) REFERENCES agent_sessions (session_id)
        ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_agent_messages_session_id
    ON agent_messages (session_id, id);
"#;

/// A session store backed by a SQLite database.
///
/// Each item is stored as one JSON row in `agent_messages`. Rows that no
/// longer decode are skipped with a warning instead of failing the whole
/// history.
#[derive(Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Opens (or creates) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("opening session database at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` on the connection in the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| {
                Error::StorageTask("connection lock poisoned".to_owned())
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|err| Error::StorageTask(err.to_string()))?
    }
}

fn decode_rows(rows: Vec<String>) -> Vec<SessionItem> {
    rows.into_iter()
        .filter_map(|data| match serde_json::from_str(&data) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!("skipping undecodable session item: {err}");
                None
            }
        })
        .collect()
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get_items(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SessionItem>> {
        let session_id = session_id.to_owned();
        // SQLite treats a negative limit as no limit.
        let limit = limit.map_or(-1, |limit| limit as i64);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT message_data FROM agent_messages
                 WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2",
            )?;
            let mut rows = stmt
                .query_map(params![session_id, limit], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            rows.reverse();
            Ok(decode_rows(rows))
        })
        .await
    }

    async fn add_items(
        &self,
        session_id: &str,
        items: &[SessionItem],
    ) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let session_id = session_id.to_owned();
        let rows = items
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO agent_sessions (session_id) VALUES (?1)",
                params![session_id],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO agent_messages (session_id, message_data)
                     VALUES (?1, ?2)",
                )?;
                for data in &rows {
                    stmt.execute(params![session_id, data])?;
                }
            }
            tx.execute(
                "UPDATE agent_sessions SET updated_at = CURRENT_TIMESTAMP
                 WHERE session_id = ?1",
                params![session_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn pop_item(&self, session_id: &str) -> Result<Option<SessionItem>> {
        let session_id = session_id.to_owned();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let latest = tx
                .query_row(
                    "SELECT id, message_data FROM agent_messages
                     WHERE session_id = ?1 ORDER BY id DESC LIMIT 1",
                    params![session_id],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?;
            let Some((id, data)) = latest else {
                return Ok(None);
            };
            tx.execute("DELETE FROM agent_messages WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(decode_rows(vec![data]).pop())
        })
        .await
    }

    async fn clear_session(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_owned();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM agent_messages WHERE session_id = ?1",
                params![session_id],
            )?;
            tx.execute(
                "DELETE FROM agent_sessions WHERE session_id = ?1",
                params![session_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
