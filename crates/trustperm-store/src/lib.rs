//! # trustperm store
//!
//! Storage abstraction for the trust permission engine. Provides a
//! trait-based interface for permission and session persistence with SQLite
//! and in-memory implementations.
//!
//! ## Overview
//!
//! The keeper reads and writes permissions through the [`Store`] trait, so
//! it does not care where records live. The primary implementation is
//! [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The synchronous trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`StagedStore`] - Per-handler overlay that buffers writes
//! - [`WriteBatch`] - Writes applied atomically by [`Store::commit`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trustperm_store::{SqliteStore, StagedStore, Store};
//!
//! let store = SqliteStore::open("perms.db").unwrap();
//!
//! let mut staged = StagedStore::new(&store);
//! let id = staged.next_permission_id().unwrap();
//! // ... build and stage a permission with `id` ...
//! store.commit(staged.into_batch()).unwrap();
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic handlers**: writes are staged and committed as one batch; a
//!   failed handler simply drops its [`StagedStore`]
//! - **Deterministic scans**: listings are ordered by key on every backend
//! - **Monotonic ids**: the permission counter never moves backwards

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod staged;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use staged::StagedStore;
pub use traits::{Store, WriteBatch};
