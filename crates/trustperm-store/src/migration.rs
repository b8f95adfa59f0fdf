//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            tracing::info!(version, "applied store migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: permissions, sessions, counters.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Permission records. The record column is the CBOR-encoded
        -- Permission; the other columns are indexed copies for lookups.
        CREATE TABLE permissions (
            id INTEGER PRIMARY KEY,
            schema_id INTEGER NOT NULL,
            perm_type INTEGER NOT NULL,       -- PermissionType::code()
            grantee TEXT NOT NULL,
            did TEXT,
            modified INTEGER NOT NULL,        -- Unix ms
            record BLOB NOT NULL
        );

        -- Credential-exchange sessions
        CREATE TABLE permission_sessions (
            id TEXT PRIMARY KEY,
            controller TEXT NOT NULL,
            modified INTEGER NOT NULL,
            record BLOB NOT NULL
        );

        -- Monotonic counters (permission ids)
        CREATE TABLE counters (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );

        CREATE INDEX idx_permissions_schema ON permissions(schema_id, perm_type);
        CREATE INDEX idx_permissions_did ON permissions(did);
        CREATE INDEX idx_permissions_modified ON permissions(modified);
        CREATE INDEX idx_sessions_modified ON permission_sessions(modified);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
