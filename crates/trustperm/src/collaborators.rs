//! Interfaces to the ledger modules the keeper depends on.
//!
//! The keeper never owns balances, schemas or registries. It reads and moves
//! them through these traits, which the host chain implements. Methods take
//! `&self`; implementations use interior mutability for their own state.

use std::sync::Arc;

use thiserror::Error;
use trustperm_core::{AccountId, CredentialSchema, Dec, TrustRegistry};

/// Failure reported by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("{0}")]
    Failed(String),
}

/// Result type for collaborator calls.
pub type CollabResult<T> = std::result::Result<T, CollaboratorError>;

/// Credential schema lookups.
pub trait CredentialSchemaKeeper: Send + Sync {
    fn credential_schema(&self, id: u64) -> CollabResult<Option<CredentialSchema>>;
}

/// Trust registry lookups and the global trust unit price.
pub trait TrustRegistryKeeper: Send + Sync {
    fn trust_registry(&self, id: u64) -> CollabResult<Option<TrustRegistry>>;

    /// Price of one trust unit in the bond denomination.
    fn trust_unit_price(&self) -> u64;
}

/// The trust-deposit ledger.
pub trait TrustDepositKeeper: Send + Sync {
    /// Add `delta` (may be negative) to `account`'s trust deposit.
    ///
    /// Positive adjustments lock funds, negative ones make them claimable.
    fn adjust_trust_deposit(&self, account: &AccountId, delta: i64) -> CollabResult<()>;

    /// Burn `amount` of `account`'s trust deposit as an ecosystem slash.
    fn burn_ecosystem_slashed_trust_deposit(&self, account: &AccountId, amount: u64)
        -> CollabResult<()>;

    /// Share of every fee locked as trust deposit.
    fn trust_deposit_rate(&self) -> Dec;

    /// Reward rate paid to the user agent.
    fn user_agent_reward_rate(&self) -> Dec;

    /// Reward rate paid to the wallet user agent.
    fn wallet_user_agent_reward_rate(&self) -> Dec;
}

/// Coin movements in the bond denomination.
pub trait BankKeeper: Send + Sync {
    fn send_coins(&self, from: &AccountId, to: &AccountId, amount: u64) -> CollabResult<()>;

    fn send_coins_from_account_to_module(
        &self,
        from: &AccountId,
        module: &str,
        amount: u64,
    ) -> CollabResult<()>;

    fn send_coins_from_module_to_account(
        &self,
        module: &str,
        to: &AccountId,
        amount: u64,
    ) -> CollabResult<()>;

    /// True if `account` holds at least `amount`.
    fn has_balance(&self, account: &AccountId, amount: u64) -> bool;
}

/// Handles to every collaborator, shared by all handlers.
#[derive(Clone)]
pub struct Collaborators {
    pub schemas: Arc<dyn CredentialSchemaKeeper>,
    pub registries: Arc<dyn TrustRegistryKeeper>,
    pub trust_deposit: Arc<dyn TrustDepositKeeper>,
    pub bank: Arc<dyn BankKeeper>,
}
