//! The permission record and its validity rules.
//!
//! A permission grants one account a role (ecosystem, grantor, issuer,
//! verifier or holder) for one credential schema. Every permission except
//! the schema's ECOSYSTEM root points at the permission that validated it,
//! forming a tree rooted at the ecosystem.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ValidityError};
use crate::types::{AccountId, PermissionId, Timestamp};

/// Role granted by a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionType {
    Issuer,
    Verifier,
    IssuerGrantor,
    VerifierGrantor,
    Ecosystem,
    Holder,
}

impl PermissionType {
    /// All variants, in wire-code order.
    pub const ALL: [PermissionType; 6] = [
        PermissionType::Issuer,
        PermissionType::Verifier,
        PermissionType::IssuerGrantor,
        PermissionType::VerifierGrantor,
        PermissionType::Ecosystem,
        PermissionType::Holder,
    ];

    /// Stable numeric code used by persistent stores.
    pub fn code(self) -> u8 {
        match self {
            PermissionType::Issuer => 1,
            PermissionType::Verifier => 2,
            PermissionType::IssuerGrantor => 3,
            PermissionType::VerifierGrantor => 4,
            PermissionType::Ecosystem => 5,
            PermissionType::Holder => 6,
        }
    }

    /// Inverse of [`PermissionType::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionType::Issuer => "ISSUER",
            PermissionType::Verifier => "VERIFIER",
            PermissionType::IssuerGrantor => "ISSUER_GRANTOR",
            PermissionType::VerifierGrantor => "VERIFIER_GRANTOR",
            PermissionType::Ecosystem => "ECOSYSTEM",
            PermissionType::Holder => "HOLDER",
        }
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownPermissionType(s.to_string()))
    }
}

/// State of a permission's validation process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VpState {
    /// Waiting for the validator to accept, or for the applicant to cancel.
    Pending,
    /// Accepted by the validator. Renewals move back to `Pending`.
    Validated,
    /// Terminal.
    Terminated,
}

impl VpState {
    pub fn as_str(self) -> &'static str {
        match self {
            VpState::Pending => "PENDING",
            VpState::Validated => "VALIDATED",
            VpState::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for VpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VpState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(VpState::Pending),
            "VALIDATED" => Ok(VpState::Validated),
            "TERMINATED" => Ok(VpState::Terminated),
            other => Err(CoreError::UnknownVpState(other.to_string())),
        }
    }
}

/// A permission record.
///
/// Timestamps are unix milliseconds. Fees are in trust units, converted to
/// the bond denomination with the trust unit price at payment time.
/// Discounts are basis points (0..=10000).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub schema_id: u64,
    pub perm_type: PermissionType,
    pub did: Option<String>,
    pub grantee: AccountId,

    pub created: Timestamp,
    pub created_by: AccountId,
    pub modified: Timestamp,
    pub extended: Option<Timestamp>,
    pub extended_by: Option<AccountId>,
    pub effective_from: Option<Timestamp>,
    pub effective_until: Option<Timestamp>,
    pub revoked: Option<Timestamp>,
    pub revoked_by: Option<AccountId>,
    pub slashed: Option<Timestamp>,
    pub slashed_by: Option<AccountId>,
    pub repaid: Option<Timestamp>,
    pub repaid_by: Option<AccountId>,
    pub terminated: Option<Timestamp>,
    pub terminated_by: Option<AccountId>,

    pub country: String,
    /// Permission that validated this one. `None` only for ECOSYSTEM roots.
    pub validator_perm_id: Option<PermissionId>,

    pub vp_state: VpState,
    pub vp_last_state_change: Timestamp,
    pub vp_exp: Option<Timestamp>,
    /// Validation fees escrowed for the in-flight request.
    pub vp_current_fees: u64,
    /// Trust deposit locked for the in-flight request.
    pub vp_current_deposit: u64,
    pub vp_summary_digest_sri: Option<String>,
    /// Trust deposit credited to the validator when it validated this permission.
    pub vp_validator_deposit: u64,

    pub validation_fees: u64,
    pub issuance_fees: u64,
    pub verification_fees: u64,
    pub issuance_fee_discount: u64,
    pub verification_fee_discount: u64,

    /// Trust deposit attributable to this permission.
    pub deposit: u64,
    pub slashed_deposit: u64,
    pub repaid_deposit: u64,
}

impl Permission {
    /// A new permission with every optional field empty and all amounts zero.
    pub fn new(
        id: PermissionId,
        perm_type: PermissionType,
        schema_id: u64,
        grantee: AccountId,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            schema_id,
            perm_type,
            did: None,
            created_by: grantee.clone(),
            grantee,
            created: now,
            modified: now,
            extended: None,
            extended_by: None,
            effective_from: None,
            effective_until: None,
            revoked: None,
            revoked_by: None,
            slashed: None,
            slashed_by: None,
            repaid: None,
            repaid_by: None,
            terminated: None,
            terminated_by: None,
            country: String::new(),
            validator_perm_id: None,
            vp_state: VpState::Pending,
            vp_last_state_change: now,
            vp_exp: None,
            vp_current_fees: 0,
            vp_current_deposit: 0,
            vp_summary_digest_sri: None,
            vp_validator_deposit: 0,
            validation_fees: 0,
            issuance_fees: 0,
            verification_fees: 0,
            issuance_fee_discount: 0,
            verification_fee_discount: 0,
            deposit: 0,
            slashed_deposit: 0,
            repaid_deposit: 0,
        }
    }

    /// True for the schema's root permission.
    pub fn is_root(&self) -> bool {
        self.perm_type == PermissionType::Ecosystem && self.validator_perm_id.is_none()
    }

    /// Slashed deposit that has not been repaid yet.
    pub fn outstanding_slash(&self) -> u64 {
        self.slashed_deposit.saturating_sub(self.repaid_deposit)
    }

    /// Not revoked and never slashed. Beneficiary walks only pay active
    /// permissions.
    pub fn is_active(&self) -> bool {
        self.revoked.is_none() && self.slashed_deposit == 0
    }

    /// Check validity at `now` for an exchange in `country`.
    ///
    /// An empty country on either side is unrestricted.
    pub fn check_valid(&self, country: &str, now: Timestamp) -> Result<(), ValidityError> {
        if let Some(revoked) = self.revoked {
            if now >= revoked {
                return Err(ValidityError::Revoked(revoked));
            }
        }

        let outstanding = self.outstanding_slash();
        if outstanding > 0 {
            return Err(ValidityError::Slashed { outstanding });
        }

        if self.vp_state == VpState::Terminated {
            return Err(ValidityError::Terminated);
        }

        if let Some(from) = self.effective_from {
            if from > now {
                return Err(ValidityError::NotYetEffective(from));
            }
        }

        if let Some(until) = self.effective_until {
            if until <= now {
                return Err(ValidityError::Expired(until));
            }
        }

        if !country_compatible(&self.country, country) {
            return Err(ValidityError::CountryMismatch {
                permission: self.country.clone(),
                requested: country.to_string(),
            });
        }

        Ok(())
    }

    /// Convenience wrapper over [`Permission::check_valid`].
    pub fn is_valid(&self, country: &str, now: Timestamp) -> bool {
        self.check_valid(country, now).is_ok()
    }
}

/// Countries match when either side is unrestricted or both are equal.
pub fn country_compatible(a: &str, b: &str) -> bool {
    a.is_empty() || b.is_empty() || a == b
}
