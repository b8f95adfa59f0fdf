//! Store trait: the abstract interface for permission persistence.
//!
//! This trait keeps the keeper storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests). Handlers never write to a
//! store directly; they stage writes in a [`crate::StagedStore`] and commit
//! the resulting [`WriteBatch`] in one step.

use std::collections::BTreeMap;

use trustperm_core::{Permission, PermissionId, PermissionSession};

use crate::error::Result;

/// A set of writes applied atomically by [`Store::commit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    /// Permissions to insert or overwrite, by id.
    pub permissions: BTreeMap<PermissionId, Permission>,
    /// Sessions to insert or overwrite, by id.
    pub sessions: BTreeMap<String, PermissionSession>,
    /// New value of the permission id counter, if it advanced.
    pub last_permission_id: Option<u64>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when committing the batch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.sessions.is_empty() && self.last_permission_id.is_none()
    }

    /// Stage a permission write.
    pub fn put_permission(&mut self, perm: Permission) {
        self.permissions.insert(perm.id, perm);
    }

    /// Stage a session write.
    pub fn put_session(&mut self, session: PermissionSession) {
        self.sessions.insert(session.id.clone(), session);
    }
}

/// The Store trait: synchronous interface for permission persistence.
///
/// Handlers run to completion without suspension, so every method is
/// blocking. Listing methods return records in ascending key order, which
/// makes scans deterministic across backends.
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Permission Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a permission by id.
    fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>>;

    /// All permissions, ordered by id.
    fn permissions(&self) -> Result<Vec<Permission>>;

    /// Highest permission id issued so far (0 when none).
    fn last_permission_id(&self) -> Result<u64>;

    // ─────────────────────────────────────────────────────────────────────────
    // Session Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a session by id.
    fn get_session(&self, id: &str) -> Result<Option<PermissionSession>>;

    /// All sessions, ordered by id.
    fn sessions(&self) -> Result<Vec<PermissionSession>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply every write in `batch`, or none of them.
    fn commit(&self, batch: WriteBatch) -> Result<()>;
}
