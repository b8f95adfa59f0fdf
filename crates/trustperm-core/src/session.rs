//! Credential-exchange sessions.

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, PermissionId, Timestamp};

/// One authorization recorded in a session.
///
/// `executor_perm_id` is the issuer permission, `beneficiary_perm_id` the
/// verifier permission. Either may be absent, but not both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionAuthz {
    pub executor_perm_id: Option<PermissionId>,
    pub beneficiary_perm_id: Option<PermissionId>,
    pub wallet_agent_perm_id: Option<PermissionId>,
}

/// A session groups the fee-paying authorizations of one user agent.
///
/// Authorizations are append-only and never repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSession {
    pub id: String,
    pub controller: AccountId,
    pub agent_perm_id: PermissionId,
    pub created: Timestamp,
    pub modified: Timestamp,
    pub authz: Vec<SessionAuthz>,
}

impl PermissionSession {
    /// True if the exact authorization tuple is already recorded.
    pub fn contains(&self, authz: &SessionAuthz) -> bool {
        self.authz.iter().any(|a| a == authz)
    }
}
