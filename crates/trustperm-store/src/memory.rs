//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use trustperm_core::{Permission, PermissionId, PermissionSession};

use crate::error::{Result, StoreError};
use crate::traits::{Store, WriteBatch};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Permissions indexed by id.
    permissions: BTreeMap<PermissionId, Permission>,

    /// Sessions indexed by id.
    sessions: BTreeMap<String, PermissionSession>,

    /// Permission id counter.
    last_permission_id: u64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        let inner = self.read()?;
        Ok(inner.permissions.get(&id).cloned())
    }

    fn permissions(&self) -> Result<Vec<Permission>> {
        let inner = self.read()?;
        Ok(inner.permissions.values().cloned().collect())
    }

    fn last_permission_id(&self) -> Result<u64> {
        Ok(self.read()?.last_permission_id)
    }

    fn get_session(&self, id: &str) -> Result<Option<PermissionSession>> {
        let inner = self.read()?;
        Ok(inner.sessions.get(id).cloned())
    }

    fn sessions(&self) -> Result<Vec<PermissionSession>> {
        let inner = self.read()?;
        Ok(inner.sessions.values().cloned().collect())
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut inner = self.write()?;

        if let Some(last) = batch.last_permission_id {
            if last < inner.last_permission_id {
                return Err(StoreError::InvalidData(format!(
                    "permission counter cannot move backwards: {} < {}",
                    last, inner.last_permission_id
                )));
            }
            inner.last_permission_id = last;
        }

        inner.permissions.extend(batch.permissions);
        inner.sessions.extend(batch.sessions);

        Ok(())
    }
}
