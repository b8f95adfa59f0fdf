//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. Records are stored as CBOR blobs
//! alongside a few indexed columns, and every [`WriteBatch`] is applied in
//! a single SQL transaction.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use trustperm_core::{Permission, PermissionId, PermissionSession};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Store, WriteBatch};

/// Counter row holding the last issued permission id.
const PERMISSION_COUNTER: &str = "permission_id";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        f(&conn)
    }

    /// Execute a blocking operation that needs mutable access.
    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        f(&mut conn)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn to_sql_int(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{} {} exceeds SQLite integer range", what, value)))
}

fn read_counter(conn: &Connection) -> Result<u64> {
    let value: Option<i64> = conn
        .query_row(
            "SELECT value FROM counters WHERE name = ?1",
            params![PERMISSION_COUNTER],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(0),
        Some(v) => u64::try_from(v)
            .map_err(|_| StoreError::InvalidData(format!("negative permission counter: {}", v))),
    }
}

fn collect_records<T: DeserializeOwned>(conn: &Connection, sql: &str) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let blobs = stmt
        .query_map([], |row| row.get::<_, Vec<u8>>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    blobs.iter().map(|b| decode(b)).collect()
}

impl Store for SqliteStore {
    fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        let key = to_sql_int(id.get(), "permission id")?;
        self.with_conn(|conn| {
            let blob: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT record FROM permissions WHERE id = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            blob.map(|b| decode(&b)).transpose()
        })
    }

    fn permissions(&self) -> Result<Vec<Permission>> {
        self.with_conn(|conn| collect_records(conn, "SELECT record FROM permissions ORDER BY id"))
    }

    fn last_permission_id(&self) -> Result<u64> {
        self.with_conn(read_counter)
    }

    fn get_session(&self, id: &str) -> Result<Option<PermissionSession>> {
        self.with_conn(|conn| {
            let blob: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT record FROM permission_sessions WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            blob.map(|b| decode(&b)).transpose()
        })
    }

    fn sessions(&self) -> Result<Vec<PermissionSession>> {
        self.with_conn(|conn| {
            collect_records(conn, "SELECT record FROM permission_sessions ORDER BY id")
        })
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if let Some(last) = batch.last_permission_id {
                let current = read_counter(&tx)?;
                if last < current {
                    return Err(StoreError::InvalidData(format!(
                        "permission counter cannot move backwards: {} < {}",
                        last, current
                    )));
                }
                tx.execute(
                    "INSERT INTO counters (name, value) VALUES (?1, ?2)
                     ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                    params![PERMISSION_COUNTER, to_sql_int(last, "permission counter")?],
                )?;
            }

            for perm in batch.permissions.values() {
                tx.execute(
                    "INSERT OR REPLACE INTO permissions
                     (id, schema_id, perm_type, grantee, did, modified, record)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        to_sql_int(perm.id.get(), "permission id")?,
                        to_sql_int(perm.schema_id, "schema id")?,
                        perm.perm_type.code(),
                        perm.grantee.as_str(),
                        perm.did.as_deref(),
                        perm.modified,
                        encode(perm)?,
                    ],
                )?;
            }

            for session in batch.sessions.values() {
                tx.execute(
                    "INSERT OR REPLACE INTO permission_sessions (id, controller, modified, record)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        session.id,
                        session.controller.as_str(),
                        session.modified,
                        encode(session)?,
                    ],
                )?;
            }

            tx.commit()?;

            tracing::debug!(
                permissions = batch.permissions.len(),
                sessions = batch.sessions.len(),
                "committed write batch"
            );
            Ok(())
        })
    }
}
