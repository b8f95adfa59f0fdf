//! # trustperm
//!
//! Hierarchical permissions and trust-deposit economics for a
//! credential-exchange network.
//!
//! ## Overview
//!
//! Every credential schema has one ECOSYSTEM permission at its root. Below
//! it, grantors, issuers, verifiers and holders obtain permissions through
//! a validation process run by the permission above them. Whenever a
//! credential is issued or verified, a session pays fees to every active
//! permission up the tree and locks part of each fee as trust deposit.
//!
//! - **Validation process**: apply, validate, renew, cancel, terminate
//! - **Authority**: extend, revoke, slash and repay deposits
//! - **Sessions**: record issuances and verifications, distribute fees
//! - **Queries**: list, get, find by DID, preview beneficiaries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trustperm::{Keeper, KeeperConfig, Collaborators};
//! use trustperm::store::SqliteStore;
//!
//! let store = SqliteStore::open("perms.db")?;
//! let keeper = Keeper::new(store, collaborators, KeeperConfig::default());
//!
//! let root = keeper.create_root_permission(now, create_root_msg)?;
//! let applicant = keeper.start_permission_vp(now, start_msg)?;
//! keeper.set_permission_vp_to_validated(now, validate_msg)?;
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic handlers**: store writes are staged and committed only on
//!   success; events are emitted after the commit
//! - **Host-owned balances**: coins, trust deposits, schemas and registries
//!   live behind the traits in [`collaborators`]
//! - **Exact arithmetic**: fee splits use 18-decimal fixed point and
//!   truncate at every split point
//!
//! ## Re-exports
//!
//! - `trustperm::core` - Permission types and validity rules
//! - `trustperm::store` - Storage abstraction, SQLite and in-memory stores

pub mod collaborators;
pub mod config;
pub mod error;
pub mod events;
pub mod fees;
pub mod keeper;
pub mod msgs;
pub mod query;
pub mod validation_process;

mod beneficiaries;
mod hierarchy;
mod lifecycle;
mod sessions;

#[cfg(test)]
mod test_support;

pub use trustperm_core as core;
pub use trustperm_store as store;

pub use collaborators::{
    BankKeeper, CollabResult, CollaboratorError, Collaborators, CredentialSchemaKeeper,
    TrustDepositKeeper, TrustRegistryKeeper,
};
pub use config::KeeperConfig;
pub use error::{ErrorKind, KeeperError, Result};
pub use events::{Event, EventKind, EventSink, TracingEventSink};
pub use fees::{plan_distribution, split_amount, BeneficiaryPayout, DistributionPlan, FeeRates, SessionFlavor, Split};
pub use keeper::Keeper;
pub use msgs::*;
pub use query::{FindPermissionsWithDid, OPEN_MODE_IMPLICIT_PERMISSION};
pub use validation_process::required_validator_type;

pub use trustperm_core::{
    AccountId, CredentialSchema, Dec, PermManagementMode, Permission, PermissionId,
    PermissionSession, PermissionType, SessionAuthz, Timestamp, TrustRegistry, VpState,
};
