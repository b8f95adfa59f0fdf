//! Walking the validator tree.
//!
//! Every permission except a schema's ECOSYSTEM root names the permission
//! that validated it. Walks follow those links upward and are bounded by a
//! visited set and the configured maximum depth, so a corrupted chain fails
//! the handler instead of looping.

use std::collections::HashSet;

use trustperm_core::{AccountId, Permission, PermissionType};
use trustperm_store::Store;

use crate::error::{KeeperError, Result};
use crate::keeper::Tx;

impl<S: Store> Tx<'_, S> {
    /// All ancestors of `perm`, nearest first.
    ///
    /// A dangling validator reference fails the walk with `NotFound`.
    pub(crate) fn ancestors(&self, perm: &Permission) -> Result<Vec<Permission>> {
        let mut visited = HashSet::from([perm.id]);
        let mut chain = Vec::new();
        let mut next = perm.validator_perm_id;

        while let Some(id) = next {
            if !visited.insert(id) {
                return Err(KeeperError::InvalidState(format!(
                    "validator chain of permission {} loops back to {}",
                    perm.id, id
                )));
            }
            if chain.len() >= self.config.max_validator_chain_depth {
                return Err(KeeperError::InvalidState(format!(
                    "validator chain of permission {} exceeds {} levels",
                    perm.id, self.config.max_validator_chain_depth
                )));
            }

            let ancestor = self.store.get_permission(id)?.ok_or_else(|| {
                KeeperError::NotFound(format!(
                    "validator {} of permission {} not found",
                    id, perm.id
                ))
            })?;

            next = ancestor.validator_perm_id;
            chain.push(ancestor);
        }

        Ok(chain)
    }

    /// Ancestors of `perm` that are not revoked and never slashed.
    ///
    /// Inactive ancestors are skipped; the walk continues above them.
    pub(crate) fn active_validator_chain(&self, perm: &Permission) -> Result<Vec<Permission>> {
        Ok(self
            .ancestors(perm)?
            .into_iter()
            .filter(Permission::is_active)
            .collect())
    }

    /// The ECOSYSTEM permission of `schema_id`, if any.
    pub(crate) fn find_ecosystem_permission(&self, schema_id: u64) -> Result<Option<Permission>> {
        Ok(self
            .store
            .permissions()?
            .into_iter()
            .find(|p| p.schema_id == schema_id && p.perm_type == PermissionType::Ecosystem))
    }

    /// First active ECOSYSTEM permission of `schema_id`.
    pub(crate) fn find_active_ecosystem_permission(
        &self,
        schema_id: u64,
    ) -> Result<Option<Permission>> {
        Ok(self.store.permissions()?.into_iter().find(|p| {
            p.schema_id == schema_id && p.perm_type == PermissionType::Ecosystem && p.is_active()
        }))
    }

    /// Is `account` the grantee of a currently valid ancestor of `perm`?
    pub(crate) fn is_valid_ancestor_grantee(
        &self,
        account: &AccountId,
        perm: &Permission,
    ) -> Result<bool> {
        Ok(self
            .ancestors(perm)?
            .iter()
            .any(|a| &a.grantee == account && a.is_valid("", self.now)))
    }
}
