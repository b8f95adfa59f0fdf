//! Request types for the keeper's state-changing handlers.
//!
//! Every request carries `creator`, the account that signed the
//! transaction. Signature checks happen before the keeper sees a request.

use serde::{Deserialize, Serialize};
use trustperm_core::{AccountId, PermissionId, PermissionType, Timestamp};

/// Create the ECOSYSTEM root permission of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRootPermission {
    pub creator: AccountId,
    pub schema_id: u64,
    pub did: Option<String>,
    pub country: String,
    pub effective_from: Option<Timestamp>,
    pub effective_until: Option<Timestamp>,
    pub validation_fees: u64,
    pub issuance_fees: u64,
    pub verification_fees: u64,
}

/// Self-create an ISSUER or VERIFIER permission on an OPEN-mode schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePermission {
    pub creator: AccountId,
    pub schema_id: u64,
    pub perm_type: PermissionType,
    pub did: Option<String>,
    pub country: String,
    pub effective_from: Option<Timestamp>,
    pub effective_until: Option<Timestamp>,
    pub verification_fees: u64,
}

/// Apply for a permission, to be validated by `validator_perm_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPermissionVp {
    pub creator: AccountId,
    pub perm_type: PermissionType,
    pub validator_perm_id: PermissionId,
    pub country: String,
    pub did: Option<String>,
    /// Fees the applicant proposes to charge once validated.
    pub validation_fees: Option<u64>,
    pub issuance_fees: Option<u64>,
    pub verification_fees: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewPermissionVp {
    pub creator: AccountId,
    pub id: PermissionId,
}

/// Validator accepts a pending request and fixes the permission's terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPermissionVpToValidated {
    pub creator: AccountId,
    pub id: PermissionId,
    pub validation_fees: u64,
    pub issuance_fees: u64,
    pub verification_fees: u64,
    pub issuance_fee_discount: u64,
    pub verification_fee_discount: u64,
    pub country: String,
    pub effective_until: Option<Timestamp>,
    pub vp_summary_digest_sri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPermissionVpLastRequest {
    pub creator: AccountId,
    pub id: PermissionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminatePermissionVp {
    pub creator: AccountId,
    pub id: PermissionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendPermission {
    pub creator: AccountId,
    pub id: PermissionId,
    pub effective_until: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokePermission {
    pub creator: AccountId,
    pub id: PermissionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashPermissionTrustDeposit {
    pub creator: AccountId,
    pub id: PermissionId,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepayPermissionSlashedTrustDeposit {
    pub creator: AccountId,
    pub id: PermissionId,
}

/// Record an issuance or verification in a session and pay its fees.
///
/// `issuer_perm_id` alone is an issuance; with `verifier_perm_id` it is a
/// verification of a credential issued under that issuer permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrUpdatePermissionSession {
    pub creator: AccountId,
    pub id: String,
    pub issuer_perm_id: Option<PermissionId>,
    pub verifier_perm_id: Option<PermissionId>,
    pub agent_perm_id: PermissionId,
    pub wallet_agent_perm_id: Option<PermissionId>,
}
