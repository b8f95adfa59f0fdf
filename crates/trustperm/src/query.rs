//! Read-only queries.
//!
//! Queries run against committed state only and never stage writes.

use serde::{Deserialize, Serialize};
use trustperm_core::{
    country_compatible, is_valid_country_code, is_valid_did, PermManagementMode, Permission, PermissionId,
    PermissionSession, PermissionType, Timestamp,
};
use trustperm_store::Store;

use crate::error::{KeeperError, Result};
use crate::keeper::Keeper;

/// Digest marking an ECOSYSTEM permission returned in place of an explicit
/// permission on an OPEN-mode schema.
pub const OPEN_MODE_IMPLICIT_PERMISSION: &str = "OPEN_MODE_IMPLICIT_PERMISSION";

/// Parameters of [`Keeper::find_permissions_with_did`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindPermissionsWithDid {
    pub did: String,
    pub perm_type: PermissionType,
    pub schema_id: u64,
    /// Empty matches every country.
    #[serde(default)]
    pub country: String,
    /// When set, only permissions valid at this instant are returned.
    #[serde(default)]
    pub when: Option<Timestamp>,
}

impl<S: Store> Keeper<S> {
    /// Resolve a requested page size against the configured bounds.
    fn page_size(&self, requested: Option<u32>) -> Result<usize> {
        let size = requested.unwrap_or(self.config().default_response_max_size);
        if size == 0 || size > self.config().max_response_size {
            return Err(KeeperError::InvalidArgument(format!(
                "response_max_size must be between 1 and {}",
                self.config().max_response_size
            )));
        }
        Ok(size as usize)
    }

    /// Permissions modified strictly after `modified_after`, oldest first.
    ///
    /// Up to `response_max_size` records are collected in id order, then
    /// sorted by modification time.
    pub fn list_permissions(
        &self,
        modified_after: Option<Timestamp>,
        response_max_size: Option<u32>,
    ) -> Result<Vec<Permission>> {
        let limit = self.page_size(response_max_size)?;
        let mut page: Vec<Permission> = self
            .store()
            .permissions()?
            .into_iter()
            .filter(|p| modified_after.map_or(true, |after| p.modified > after))
            .take(limit)
            .collect();
        page.sort_by_key(|p| p.modified);
        Ok(page)
    }

    pub fn get_permission(&self, id: PermissionId) -> Result<Permission> {
        if id.get() == 0 {
            return Err(KeeperError::InvalidArgument("permission id is required".into()));
        }
        self.store()
            .get_permission(id)?
            .ok_or_else(|| KeeperError::NotFound(format!("permission {} not found", id)))
    }

    pub fn get_permission_session(&self, id: &str) -> Result<PermissionSession> {
        if id.is_empty() {
            return Err(KeeperError::InvalidArgument("session id is required".into()));
        }
        self.store()
            .get_session(id)?
            .ok_or_else(|| KeeperError::NotFound(format!("session {} not found", id)))
    }

    /// Sessions modified strictly after `modified_after`, oldest first.
    pub fn list_permission_sessions(
        &self,
        modified_after: Option<Timestamp>,
        response_max_size: Option<u32>,
    ) -> Result<Vec<PermissionSession>> {
        let limit = self.page_size(response_max_size)?;
        let mut page: Vec<PermissionSession> = self
            .store()
            .sessions()?
            .into_iter()
            .filter(|s| modified_after.map_or(true, |after| s.modified > after))
            .take(limit)
            .collect();
        page.sort_by_key(|s| s.modified);
        Ok(page)
    }

    /// Permissions of `did` for a schema and type.
    ///
    /// On OPEN-mode schemas with no explicit match, the schema's ECOSYSTEM
    /// permission is returned with its digest set to
    /// [`OPEN_MODE_IMPLICIT_PERMISSION`].
    pub fn find_permissions_with_did(&self, query: &FindPermissionsWithDid) -> Result<Vec<Permission>> {
        if !is_valid_did(&query.did) {
            return Err(KeeperError::InvalidArgument(format!("invalid DID: {}", query.did)));
        }
        if !query.country.is_empty() && !is_valid_country_code(&query.country) {
            return Err(KeeperError::InvalidArgument(format!(
                "invalid country code: {}",
                query.country
            )));
        }

        self.view(query.when.unwrap_or_default(), |tx| {
            let schema = tx.load_schema(query.schema_id)?;
            let matches_time_and_place = |p: &Permission| match query.when {
                Some(when) => p.is_valid(&query.country, when),
                None => country_compatible(&p.country, &query.country),
            };

            let perms = tx.store.permissions()?;
            let found: Vec<Permission> = perms
                .iter()
                .filter(|p| {
                    p.schema_id == query.schema_id
                        && p.perm_type == query.perm_type
                        && p.did.as_deref() == Some(query.did.as_str())
                        && matches_time_and_place(p)
                })
                .cloned()
                .collect();

            let open = match query.perm_type {
                PermissionType::Issuer => schema.issuer_perm_management_mode == PermManagementMode::Open,
                PermissionType::Verifier => {
                    schema.verifier_perm_management_mode == PermManagementMode::Open
                }
                _ => false,
            };
            if !found.is_empty() || !open {
                return Ok(found);
            }

            Ok(perms
                .into_iter()
                .find(|p| {
                    p.schema_id == query.schema_id
                        && p.perm_type == PermissionType::Ecosystem
                        && matches_time_and_place(p)
                })
                .map(|mut ecosystem| {
                    ecosystem.vp_summary_digest_sri = Some(OPEN_MODE_IMPLICIT_PERMISSION.to_string());
                    ecosystem
                })
                .into_iter()
                .collect())
        })
    }

    /// Permissions that would be paid by a session with these participants
    /// at `now`. Both participants, when given, must be valid.
    pub fn find_beneficiaries(
        &self,
        now: Timestamp,
        issuer_perm_id: Option<PermissionId>,
        verifier_perm_id: Option<PermissionId>,
    ) -> Result<Vec<Permission>> {
        self.view(now, |tx| {
            let load = |id: PermissionId, role: &str| -> Result<Permission> {
                let perm = tx.load_permission(id, role)?;
                tx.require_valid(&perm, &perm.country, role)?;
                Ok(perm)
            };
            let issuer = issuer_perm_id.map(|id| load(id, "issuer")).transpose()?;
            let verifier = verifier_perm_id.map(|id| load(id, "verifier")).transpose()?;
            tx.find_beneficiaries(issuer.as_ref(), verifier.as_ref())
        })
    }
}
