//! Strong type definitions for trustperm.
//!
//! Identifiers are newtypes so a permission id can never be confused with a
//! schema id or an account address at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix time in milliseconds.
pub type Timestamp = i64;

/// Milliseconds in one day. Validity periods are expressed in days.
pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Upper bound for fee discounts, in basis points (10000 = 100%).
pub const MAX_DISCOUNT_BPS: u64 = 10_000;

/// Identifier of a permission record.
///
/// Assigned from a monotonically increasing counter starting at 1. The value
/// 0 is never issued; "no permission" is expressed as `Option<PermissionId>`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionId(pub u64);

impl PermissionId {
    /// Wrap a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PermissionId({})", self.0)
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PermissionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// An on-ledger account address (bech32 in production, any string in tests).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    /// Create an account id from anything string-like.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when no address was supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(addr: &str) -> Self {
        Self(addr.to_string())
    }
}

impl From<String> for AccountId {
    fn from(addr: String) -> Self {
        Self(addr)
    }
}
