use rusqlite::Connection;

use crate::error::Result;

/// Initialise the connections table.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS connections (
            id           TEXT PRIMARY KEY,
            connected_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}
