//! # trustperm testkit
//!
//! Testing utilities for trustperm.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A keeper wired to collaborators that track real balances
//! - **Golden vectors**: Fee distributions with exact expected amounts
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! Build a permission tree through the same handlers production uses:
//!
//! ```rust
//! use trustperm::{PermManagementMode, PermissionType};
//! use trustperm_testkit::fixtures::{TestFixture, Terms};
//!
//! let fx = TestFixture::new();
//! fx.add_schema(1, 10, "controller", PermManagementMode::GrantorValidation, PermManagementMode::Open);
//! let root = fx.create_root(1_000, 10, "controller", &Terms::validation(100)).unwrap();
//! let grantor = fx
//!     .grant(1_000, PermissionType::IssuerGrantor, root, "grantor", &Terms::issuance(5))
//!     .unwrap();
//!
//! assert_eq!(fx.balance("controller"), 100);
//! assert_eq!(fx.permission(grantor).unwrap().deposit, 20);
//! ```
//!
//! ## Golden Vectors
//!
//! ```rust
//! use trustperm_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, actual) in verify_all_vectors().unwrap() {
//!     assert!(matches, "{}: {}", name, actual);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use trustperm_testkit::generators::FeeScenario;
//!
//! proptest! {
//!     #[test]
//!     fn debit_is_covered(scenario: FeeScenario) {
//!         let plan = plan_distribution(&scenario.beneficiaries(), scenario.flavor, 0, &scenario.rates())?;
//!         prop_assert!(plan.total_debit() <= plan.trust_fees);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    session_id, validation_msg, Ledger, Movement, PermissionTree, Rates, Terms, TestFixture,
    TREE_CONTROLLER, TREE_SCHEMA_ID,
};
pub use generators::FeeScenario;
pub use vectors::{all_vectors, verify_all_vectors, FeeVector};
