use std::sync::Mutex;

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;
use crate::types::ConnectionId;

/// The set of believed-open viewer connections, persisted outside the
/// dispatcher so it survives across independent units of work.
///
/// False positives (a dead connection still listed) are expected and pruned
/// reactively by the dispatcher; a live connection must never be missing
/// except transiently while its registration is in flight. All three
/// operations are idempotent, so conflicting add/remove of the same id can
/// resolve in either order.
pub trait ConnectionRegistry: Send + Sync {
    fn add(&self, id: &ConnectionId) -> Result<()>;
    fn remove(&self, id: &ConnectionId) -> Result<()>;
    fn list_all(&self) -> Result<Vec<ConnectionId>>;
}

/// SQLite-backed registry.
///
/// Wraps a single connection in a `Mutex` — the lifecycle handler writes and
/// the dispatcher reads/deletes, and per-key last-writer-wins is all the
/// coordination the contract asks for.
pub struct SqliteRegistry {
    db: Mutex<Connection>,
}

impl SqliteRegistry {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }
}

impl ConnectionRegistry for SqliteRegistry {
    fn add(&self, id: &ConnectionId) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR IGNORE INTO connections (id, connected_at) VALUES (?1, ?2)",
            rusqlite::params![id.as_str(), now],
        )?;
        debug!(conn_id = %id, "connection added to registry");
        Ok(())
    }

    fn remove(&self, id: &ConnectionId) -> Result<()> {
        let db = self.db.lock().unwrap();
        // Zero affected rows is fine — remove of an absent id is a no-op.
        db.execute(
            "DELETE FROM connections WHERE id = ?1",
            rusqlite::params![id.as_str()],
        )?;
        debug!(conn_id = %id, "connection removed from registry");
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<ConnectionId>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT id FROM connections ORDER BY connected_at, id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows
            .filter_map(|r| r.ok())
            .map(ConnectionId::from)
            .collect())
    }
}
