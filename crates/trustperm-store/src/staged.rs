//! Staged writes over a committed store.
//!
//! A [`StagedStore`] gives one handler a private view of the store: reads see
//! the committed state overlaid with the handler's own writes, and nothing
//! reaches the underlying store until [`StagedStore::into_batch`] is passed to
//! [`Store::commit`]. Dropping a staged store discards every write.

use std::collections::BTreeMap;

use trustperm_core::{Permission, PermissionId, PermissionSession};

use crate::error::{Result, StoreError};
use crate::traits::{Store, WriteBatch};

/// A read-through, write-buffering view of a [`Store`].
pub struct StagedStore<'a, S: Store + ?Sized> {
    base: &'a S,
    batch: WriteBatch,
    /// Cached counter, loaded on first id allocation.
    last_permission_id: Option<u64>,
}

impl<'a, S: Store + ?Sized> StagedStore<'a, S> {
    /// Start staging writes on top of `base`.
    pub fn new(base: &'a S) -> Self {
        Self {
            base,
            batch: WriteBatch::new(),
            last_permission_id: None,
        }
    }

    /// Get a permission, preferring staged writes.
    pub fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        match self.batch.permissions.get(&id) {
            Some(perm) => Ok(Some(perm.clone())),
            None => self.base.get_permission(id),
        }
    }

    /// All permissions ordered by id, with staged writes applied.
    pub fn permissions(&self) -> Result<Vec<Permission>> {
        let mut merged: BTreeMap<PermissionId, Permission> = self
            .base
            .permissions()?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        for (id, perm) in &self.batch.permissions {
            merged.insert(*id, perm.clone());
        }
        Ok(merged.into_values().collect())
    }

    /// Get a session, preferring staged writes.
    pub fn get_session(&self, id: &str) -> Result<Option<PermissionSession>> {
        match self.batch.sessions.get(id) {
            Some(session) => Ok(Some(session.clone())),
            None => self.base.get_session(id),
        }
    }

    /// All sessions ordered by id, with staged writes applied.
    pub fn sessions(&self) -> Result<Vec<PermissionSession>> {
        let mut merged: BTreeMap<String, PermissionSession> = self
            .base
            .sessions()?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        for (id, session) in &self.batch.sessions {
            merged.insert(id.clone(), session.clone());
        }
        Ok(merged.into_values().collect())
    }

    /// Stage a permission write.
    pub fn put_permission(&mut self, perm: Permission) {
        self.batch.put_permission(perm);
    }

    /// Stage a session write.
    pub fn put_session(&mut self, session: PermissionSession) {
        self.batch.put_session(session);
    }

    /// Allocate the next permission id.
    ///
    /// The counter advance is part of the batch, so an aborted handler does
    /// not burn ids.
    pub fn next_permission_id(&mut self) -> Result<PermissionId> {
        let last = match self.last_permission_id {
            Some(last) => last,
            None => self.base.last_permission_id()?,
        };
        let next = last
            .checked_add(1)
            .ok_or_else(|| StoreError::InvalidData("permission id counter overflow".into()))?;

        self.last_permission_id = Some(next);
        self.batch.last_permission_id = Some(next);
        Ok(PermissionId(next))
    }

    /// True when writes are staged.
    pub fn is_dirty(&self) -> bool {
        !self.batch.is_empty()
    }

    /// Finish staging and hand back the writes for [`Store::commit`].
    pub fn into_batch(self) -> WriteBatch {
        self.batch
    }
}
