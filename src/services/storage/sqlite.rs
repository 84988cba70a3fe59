use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::SlotStore;

/// Slots stored as rows of the `slots` table, one whole payload per row.
pub struct SqliteSlotStore {
    conn: Connection,
}

impl SqliteSlotStore {
    /// Takes over an open connection, creating the `slots` table if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        create_slots_table(&conn)?;
        Ok(Self { conn })
    }

    /// Opens (or creates) the database file at `path`. `":memory:"` works too.
    pub fn open(path: &str) -> Result<Self> {
        let conn =
            Connection::open(path).with_context(|| format!("Failed to open database at {}", path))?;
        Self::new(conn)
    }
}

fn create_slots_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS slots (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create slots table")?;
    Ok(())
}

impl SlotStore for SqliteSlotStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM slots WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .with_context(|| format!("Failed to load slot {}", key))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO slots (key, value, updated_at)
                 VALUES (?1, ?2, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![key, value],
            )
            .with_context(|| format!("Failed to save slot {}", key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_upserts_slot_rows() {
        let mut store = SqliteSlotStore::open(":memory:").unwrap();
        assert_eq!(store.load("k").unwrap(), None);

        store.save("k", "first").unwrap();
        store.save("k", "second").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("second"));

        let rows: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM slots", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_adopts_connection_with_existing_table() {
        let conn = Connection::open_in_memory().unwrap();
        create_slots_table(&conn).unwrap();
        conn.execute(
            "INSERT INTO slots (key, value) VALUES ('k', 'seeded')",
            [],
        )
        .unwrap();

        let store = SqliteSlotStore::new(conn).unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("seeded"));
    }

    #[test]
    fn test_slots_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client.db");
        let path = path.to_str().unwrap();

        SqliteSlotStore::open(path).unwrap().save("k", "kept").unwrap();
        let reopened = SqliteSlotStore::open(path).unwrap();
        assert_eq!(reopened.load("k").unwrap().as_deref(), Some("kept"));
    }
}
