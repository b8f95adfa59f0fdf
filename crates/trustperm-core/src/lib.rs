//! # trustperm core
//!
//! Pure types for the trust permission engine: permissions, sessions,
//! fixed-point decimals, and the rules that decide whether a permission is
//! valid at a given instant.
//!
//! This crate contains no I/O and no storage. Everything here is plain data
//! and deterministic computation.
//!
//! ## Key Types
//!
//! - [`Permission`] - A role granted to an account for a credential schema
//! - [`PermissionType`] - Ecosystem, grantor, issuer, verifier or holder
//! - [`VpState`] - State of a permission's validation process
//! - [`PermissionSession`] - Fee-paying authorizations of a user agent
//! - [`Dec`] - 18-decimal fixed-point number used for every fee split
//!
//! ## Validity
//!
//! A permission is valid at `T` when it is not revoked, has no outstanding
//! slashed deposit, is inside its effective window, and its country is
//! compatible with the requested one. See [`Permission::check_valid`].

pub mod decimal;
pub mod error;
pub mod permission;
pub mod schema;
pub mod session;
pub mod types;
pub mod validation;

pub use decimal::Dec;
pub use error::{CoreError, DecimalError, ValidityError};
pub use permission::{country_compatible, Permission, PermissionType, VpState};
pub use schema::{CredentialSchema, PermManagementMode, TrustRegistry};
pub use session::{PermissionSession, SessionAuthz};
pub use types::{AccountId, PermissionId, Timestamp, DAY_MILLIS, MAX_DISCOUNT_BPS};
pub use validation::{is_valid_country_code, is_valid_did};
