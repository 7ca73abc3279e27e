//! Local SQLite key/value store.
//!
//! Uses rusqlite with WAL mode. Holds the order cache envelope and the flags
//! blob (see `storage.rs`); one row per key.

use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::error::StoreError;
use crate::storage::KeyValueStore;

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 1;

const DB_FILE_NAME: &str = "dashboard.db";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    pub db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) `{data_dir}/dashboard.db`.
    ///
    /// On corruption or open failure, deletes the file and retries once: the
    /// store only holds a cache.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(data_dir)
            .map_err(|e| StoreError::Init(format!("Failed to create data dir: {e}")))?;

        let db_path = data_dir.join(DB_FILE_NAME);
        info!("Opening store at {}", db_path.display());

        let conn = match open_and_migrate(&db_path) {
            Ok(c) => c,
            Err(first_err) => {
                warn!(
                    "Store open failed ({}), deleting and retrying once",
                    first_err
                );
                if db_path.exists() {
                    let _ = fs::remove_file(&db_path);
                    let _ = fs::remove_file(db_path.with_extension("db-wal"));
                    let _ = fs::remove_file(db_path.with_extension("db-shm"));
                }
                open_and_migrate(&db_path)?
            }
        };

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn open_and_migrate(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    info!("Migrating store from v{current} to v{CURRENT_SCHEMA_VERSION}");
    if current < 1 {
        migrate_v1(conn)?;
    }
    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "BEGIN;
         CREATE TABLE IF NOT EXISTS local_store (
            store_key TEXT PRIMARY KEY,
            store_value TEXT NOT NULL,
            updated_at TEXT DEFAULT (datetime('now'))
         );
         INSERT INTO schema_version (version) VALUES (1);
         COMMIT;",
    )?;
    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT store_value FROM local_store WHERE store_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO local_store (store_key, store_value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(store_key) DO UPDATE SET
                store_value = excluded.store_value,
                updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM local_store WHERE store_key = ?1", params![key])?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM local_store", [])?;
        Ok(())
    }
}
