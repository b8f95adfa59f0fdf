//! Error types for trustperm core.

use thiserror::Error;

use crate::types::Timestamp;

/// Errors from fixed-point arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalError {
    #[error("decimal overflow")]
    Overflow,

    #[error("decimal result would be negative")]
    Negative,

    #[error("invalid decimal: {0}")]
    Parse(String),
}

/// Reasons a permission is not valid at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidityError {
    #[error("permission was revoked at {0}")]
    Revoked(Timestamp),

    #[error("permission has an outstanding slashed deposit of {outstanding}")]
    Slashed { outstanding: u64 },

    #[error("permission is not effective until {0}")]
    NotYetEffective(Timestamp),

    #[error("permission expired at {0}")]
    Expired(Timestamp),

    #[error("permission country {permission} does not match {requested}")]
    CountryMismatch {
        permission: String,
        requested: String,
    },

    #[error("permission validation process is terminated")]
    Terminated,
}

/// Core errors for value parsing and format checks.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("decimal error: {0}")]
    Decimal(#[from] DecimalError),

    #[error("unknown permission type: {0}")]
    UnknownPermissionType(String),

    #[error("unknown validation state: {0}")]
    UnknownVpState(String),

    #[error("unknown management mode: {0}")]
    UnknownManagementMode(String),
}
