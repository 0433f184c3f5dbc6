//! Local record store for UV check history.
//!
//! `HistoryStore` abstracts the storage engine; `SqliteHistoryStore` is the
//! durable implementation and the single source of truth for the history list.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::StoreResult;
use crate::record::{HistoryRecord, NewHistoryRecord};

const SCHEMA_VERSION: i32 = 1;

const SELECT_COLUMNS: &str = "SELECT id, timestamp, latitude, longitude, address, uv_index, \
     risk_category, advice, photo_ref, note, synced FROM history";

/// Trait for history storage backends.
///
/// Mutations addressed to an id that does not exist are no-ops, not errors.
/// Implementations don't need to be Sync - the coordinator serialises
/// access through a Mutex.
pub trait HistoryStore: Send {
    /// Insert a record and return its newly assigned id.
    fn insert(&self, record: &NewHistoryRecord) -> StoreResult<i64>;

    /// All records, newest first by timestamp.
    fn all(&self) -> StoreResult<Vec<HistoryRecord>>;

    /// Get a record by id, `None` if absent.
    fn get(&self, id: i64) -> StoreResult<Option<HistoryRecord>>;

    /// Replace the photo reference of a record.
    fn update_photo(&self, id: i64, photo_ref: &str) -> StoreResult<()>;

    /// Set the synced flag if the record still carries the photo reference
    /// that was published. Returns whether the flag was set; `false` means the
    /// record is gone or its photo changed since the publish started. Never
    /// clears the flag.
    fn mark_synced(&self, id: i64, published_photo_ref: &str) -> StoreResult<bool>;

    /// Delete one record.
    fn delete(&self, id: i64) -> StoreResult<()>;

    /// Delete every record.
    fn delete_all(&self) -> StoreResult<()>;

    /// Records not yet mirrored, oldest first.
    fn unsynced(&self) -> StoreResult<Vec<HistoryRecord>>;

    /// Number of stored records.
    fn count(&self) -> StoreResult<usize> {
        Ok(self.all()?.len())
    }
}

/// SQLite-based history storage.
pub struct SqliteHistoryStore {
    conn: Connection,
}

impl SqliteHistoryStore {
    /// Open or create the database at the given path.
    ///
    /// Creates the parent directory and schema if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        tracing::debug!("Opened history database at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    #[cfg(test)]
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> StoreResult<()> {
        self.conn
            .execute("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)", [])?;

        let version: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .optional()?
            .unwrap_or(0);

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                address TEXT NOT NULL,
                uv_index REAL NOT NULL,
                risk_category TEXT NOT NULL,
                advice TEXT NOT NULL,
                photo_ref TEXT NOT NULL DEFAULT '',
                note TEXT NULL,
                synced INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_history_timestamp ON history(timestamp DESC);
            CREATE INDEX IF NOT EXISTS idx_history_synced ON history(synced);
            "#,
        )?;

        if version < SCHEMA_VERSION {
            self.conn.execute("DELETE FROM schema_version", [])?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    /// Convert a database row to a HistoryRecord.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<HistoryRecord> {
        let synced: i32 = row.get(10)?;

        Ok(HistoryRecord {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            address: row.get(4)?,
            uv_index: row.get(5)?,
            risk_category: row.get(6)?,
            advice: row.get(7)?,
            photo_ref: row.get(8)?,
            note: row.get(9)?,
            synced: synced != 0,
        })
    }

    fn query_records(&self, sql: &str) -> StoreResult<Vec<HistoryRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], Self::row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn insert(&self, record: &NewHistoryRecord) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO history (timestamp, latitude, longitude, address, uv_index,
                                  risk_category, advice, photo_ref, note, synced)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
            params![
                record.timestamp,
                record.latitude,
                record.longitude,
                record.address,
                record.uv_index,
                record.risk_category,
                record.advice,
                record.photo_ref,
                record.note,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!("Inserted history record {}", id);
        Ok(id)
    }

    fn all(&self) -> StoreResult<Vec<HistoryRecord>> {
        self.query_records(&format!("{} ORDER BY timestamp DESC, id DESC", SELECT_COLUMNS))
    }

    fn get(&self, id: i64) -> StoreResult<Option<HistoryRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn update_photo(&self, id: i64, photo_ref: &str) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE history SET photo_ref = ?1 WHERE id = ?2",
            params![photo_ref, id],
        )?;
        Ok(())
    }

    fn mark_synced(&self, id: i64, published_photo_ref: &str) -> StoreResult<bool> {
        let updated = self.conn.execute(
            "UPDATE history SET synced = 1 WHERE id = ?1 AND photo_ref = ?2",
            params![id, published_photo_ref],
        )?;
        Ok(updated > 0)
    }

    fn delete(&self, id: i64) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM history WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn delete_all(&self) -> StoreResult<()> {
        let removed = self.conn.execute("DELETE FROM history", [])?;
        tracing::debug!("Cleared {} history records", removed);
        Ok(())
    }

    fn unsynced(&self) -> StoreResult<Vec<HistoryRecord>> {
        self.query_records(&format!("{} WHERE synced = 0 ORDER BY id ASC", SELECT_COLUMNS))
    }

    fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
