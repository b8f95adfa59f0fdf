//! Read-only views of the records owned by neighbouring ledger modules.
//!
//! Credential schemas and trust registries are managed elsewhere; the
//! engine only needs the fields below.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::permission::PermissionType;
use crate::types::AccountId;

/// How issuer or verifier permissions are granted for a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermManagementMode {
    /// Anyone may self-create the permission; the ecosystem is paid directly.
    Open,
    /// A grantor validates applicants.
    GrantorValidation,
    /// The ecosystem itself validates applicants.
    Ecosystem,
}

impl PermManagementMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PermManagementMode::Open => "OPEN",
            PermManagementMode::GrantorValidation => "GRANTOR_VALIDATION",
            PermManagementMode::Ecosystem => "ECOSYSTEM",
        }
    }
}

impl fmt::Display for PermManagementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermManagementMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(PermManagementMode::Open),
            "GRANTOR_VALIDATION" => Ok(PermManagementMode::GrantorValidation),
            "ECOSYSTEM" => Ok(PermManagementMode::Ecosystem),
            other => Err(CoreError::UnknownManagementMode(other.to_string())),
        }
    }
}

/// The parts of a credential schema the permission engine reads.
///
/// Validity periods are in days; zero means "never expires".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSchema {
    pub id: u64,
    pub tr_id: u64,
    pub issuer_perm_management_mode: PermManagementMode,
    pub verifier_perm_management_mode: PermManagementMode,
    pub issuer_grantor_validation_validity_period: u32,
    pub verifier_grantor_validation_validity_period: u32,
    pub issuer_validation_validity_period: u32,
    pub verifier_validation_validity_period: u32,
    pub holder_validation_validity_period: u32,
}

impl CredentialSchema {
    /// Validation validity period, in days, for permissions of `perm_type`.
    pub fn validity_period_days(&self, perm_type: PermissionType) -> u32 {
        match perm_type {
            PermissionType::IssuerGrantor => self.issuer_grantor_validation_validity_period,
            PermissionType::VerifierGrantor => self.verifier_grantor_validation_validity_period,
            PermissionType::Issuer => self.issuer_validation_validity_period,
            PermissionType::Verifier => self.verifier_validation_validity_period,
            PermissionType::Holder => self.holder_validation_validity_period,
            PermissionType::Ecosystem => 0,
        }
    }
}

/// The parts of a trust registry the permission engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRegistry {
    pub id: u64,
    pub controller: AccountId,
}
