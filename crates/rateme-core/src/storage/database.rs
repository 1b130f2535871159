//! SQLite-backed key-value store.
//!
//! Every namespace shares one `kv` table:
//!
//! ```sql
//! CREATE TABLE kv (
//!     namespace TEXT NOT NULL,
//!     key       TEXT NOT NULL,
//!     kind      TEXT NOT NULL,   -- 'int' | 'long' | 'bool'
//!     value     INTEGER NOT NULL,
//!     PRIMARY KEY (namespace, key)
//! );
//! ```

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, TransactionBehavior};

use super::data_dir;
use super::kv::{Edit, KeyValueStore, StoreValue, UpdateFn};
use crate::error::StoreError;

/// Current schema version.
const SCHEMA_VERSION: i32 = 1;

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable store backed by a single SQLite file.
///
/// `Connection` is not `Sync`, so it lives behind a `Mutex`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    namespace: String,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, scoped to `namespace`.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the file cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>, namespace: impl Into<String>) -> Result<Self, StoreError> {
        let namespace = namespace.into();
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            StoreError::unavailable(&namespace, format!("open {}: {e}", path.display()))
        })?;
        Self::with_connection(conn, namespace)
    }

    /// Open `rateme.db` inside [`data_dir`].
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the data directory or the database
    /// cannot be prepared.
    pub fn open_default(namespace: impl Into<String>) -> Result<Self, StoreError> {
        let namespace = namespace.into();
        let dir = data_dir().map_err(|e| StoreError::unavailable(&namespace, e.to_string()))?;
        Self::open(dir.join("rateme.db"), namespace)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory(namespace: impl Into<String>) -> Result<Self, StoreError> {
        let namespace = namespace.into();
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::unavailable(&namespace, e.to_string()))?;
        Self::with_connection(conn, namespace)
    }

    fn with_connection(conn: Connection, namespace: String) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .and_then(|()| migrate(&conn))
            .map_err(|e| StoreError::unavailable(&namespace, e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            namespace,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn unavailable(&self, err: rusqlite::Error) -> StoreError {
        StoreError::unavailable(&self.namespace, err.to_string())
    }
}

impl KeyValueStore for SqliteStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get(&self, key: &str) -> Result<Option<StoreValue>, StoreError> {
        let conn = self.lock();
        read_value(&conn, &self.namespace, key)
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<StoreValue>>, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction().map_err(|e| self.unavailable(e))?;
        let values = keys
            .iter()
            .map(|key| read_value(&tx, &self.namespace, key))
            .collect::<Result<Vec<_>, _>>()?;
        tx.commit().map_err(|e| self.unavailable(e))?;
        Ok(values)
    }

    fn apply(&self, edits: &[Edit]) -> Result<(), StoreError> {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| self.unavailable(e))?;
        write_edits(&tx, &self.namespace, edits)?;
        tx.commit().map_err(|e| self.unavailable(e))
    }

    fn update(&self, keys: &[&str], f: &mut UpdateFn<'_>) -> Result<(), StoreError> {
        let mut conn = self.lock();
        // IMMEDIATE takes the database write lock before the read, so no other
        // connection can commit between the read and the write below.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| self.unavailable(e))?;
        let read = keys
            .iter()
            .map(|key| read_value(&tx, &self.namespace, key))
            .collect::<Result<Vec<_>, _>>()?;
        let edits = f(&read)?;
        write_edits(&tx, &self.namespace, &edits)?;
        tx.commit().map_err(|e| self.unavailable(e))
    }
}

fn read_value(
    conn: &Connection,
    namespace: &str,
    key: &str,
) -> Result<Option<StoreValue>, StoreError> {
    let result = conn.query_row(
        "SELECT kind, value FROM kv WHERE namespace = ?1 AND key = ?2",
        params![namespace, key],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
    );
    let (kind, raw) = match result {
        Ok(row) => row,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(StoreError::unavailable(namespace, e.to_string())),
    };

    let value = match kind.as_str() {
        "int" => i32::try_from(raw).map(StoreValue::Int).map_err(|_| {
            StoreError::unavailable(
                namespace,
                format!("key '{key}' holds out-of-range int {raw}"),
            )
        })?,
        "long" => StoreValue::Long(raw),
        "bool" => StoreValue::Bool(raw != 0),
        other => {
            return Err(StoreError::unavailable(
                namespace,
                format!("key '{key}' has unknown kind '{other}'"),
            ))
        }
    };
    Ok(Some(value))
}

fn write_edits(conn: &Connection, namespace: &str, edits: &[Edit]) -> Result<(), StoreError> {
    for edit in edits {
        let result = match edit {
            Edit::Put(key, value) => {
                let raw = match *value {
                    StoreValue::Int(v) => i64::from(v),
                    StoreValue::Long(v) => v,
                    StoreValue::Bool(v) => i64::from(v),
                };
                conn.execute(
                    "INSERT OR REPLACE INTO kv (namespace, key, kind, value)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![namespace, key, value.kind(), raw],
                )
            }
            Edit::Remove(key) => conn.execute(
                "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
            ),
        };
        result.map_err(|e| StoreError::unavailable(namespace, e.to_string()))?;
    }
    Ok(())
}

/// Bring the schema up to [`SCHEMA_VERSION`].
fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )?;

    let current: i32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
            row.get(0)
        })?;

    if current < 1 {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                namespace TEXT NOT NULL,
                key       TEXT NOT NULL,
                kind      TEXT NOT NULL,
                value     INTEGER NOT NULL,
                PRIMARY KEY (namespace, key)
            );",
        )?;
        conn.execute("DELETE FROM schema_version", [])?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
    }
    Ok(())
}
