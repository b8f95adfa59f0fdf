//! The Keeper: entry point for every permission operation.
//!
//! Each state-changing handler runs inside a [`Tx`]. The transaction stages
//! store writes and collects events; the keeper commits the writes and
//! emits the events only when the handler returns `Ok`.

use std::sync::Arc;

use trustperm_core::{
    AccountId, CredentialSchema, Permission, PermissionId, Timestamp, TrustRegistry,
};
use trustperm_store::{StagedStore, Store};

use crate::collaborators::Collaborators;
use crate::config::KeeperConfig;
use crate::error::{KeeperError, Result};
use crate::events::{Event, EventSink, TracingEventSink};

/// The permission keeper.
///
/// Owns the permission store and shares handles to its collaborators.
pub struct Keeper<S: Store> {
    /// The storage backend.
    store: S,
    /// Ledger modules the keeper calls into.
    deps: Collaborators,
    /// Receives events after commit.
    events: Arc<dyn EventSink>,
    /// Configuration.
    config: KeeperConfig,
}

impl<S: Store> Keeper<S> {
    /// Create a keeper that logs events through `tracing`.
    pub fn new(store: S, deps: Collaborators, config: KeeperConfig) -> Self {
        Self {
            store,
            deps,
            events: Arc::new(TracingEventSink),
            config,
        }
    }

    /// Replace the event sink.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.deps
    }

    /// Run `f` as one atomic handler at block time `now`.
    pub(crate) fn transact<T>(
        &self,
        now: Timestamp,
        f: impl FnOnce(&mut Tx<'_, S>) -> Result<T>,
    ) -> Result<T> {
        let mut tx = Tx::new(&self.store, &self.deps, &self.config, now);
        let out = f(&mut tx)?;

        let Tx { store, events, .. } = tx;
        self.store.commit(store.into_batch())?;

        for event in events {
            self.events.emit(event);
        }
        Ok(out)
    }

    /// Run a read-only computation against the committed state.
    pub(crate) fn view<T>(&self, now: Timestamp, f: impl FnOnce(&Tx<'_, S>) -> Result<T>) -> Result<T> {
        let tx = Tx::new(&self.store, &self.deps, &self.config, now);
        f(&tx)
    }
}

/// Per-handler context: staged store, collaborators, block time.
pub(crate) struct Tx<'a, S: Store> {
    pub(crate) store: StagedStore<'a, S>,
    pub(crate) deps: &'a Collaborators,
    pub(crate) config: &'a KeeperConfig,
    pub(crate) now: Timestamp,
    events: Vec<Event>,
}

impl<'a, S: Store> Tx<'a, S> {
    fn new(store: &'a S, deps: &'a Collaborators, config: &'a KeeperConfig, now: Timestamp) -> Self {
        Self {
            store: StagedStore::new(store),
            deps,
            config,
            now,
            events: Vec::new(),
        }
    }

    pub(crate) fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────────────────

    /// Load a permission or fail with NotFound naming its role.
    pub(crate) fn load_permission(&self, id: PermissionId, role: &str) -> Result<Permission> {
        self.store
            .get_permission(id)?
            .ok_or_else(|| KeeperError::NotFound(format!("{} permission {} not found", role, id)))
    }

    pub(crate) fn load_schema(&self, schema_id: u64) -> Result<CredentialSchema> {
        self.deps
            .schemas
            .credential_schema(schema_id)?
            .ok_or_else(|| KeeperError::NotFound(format!("credential schema {} not found", schema_id)))
    }

    pub(crate) fn load_trust_registry(&self, tr_id: u64) -> Result<TrustRegistry> {
        self.deps
            .registries
            .trust_registry(tr_id)?
            .ok_or_else(|| KeeperError::NotFound(format!("trust registry {} not found", tr_id)))
    }

    pub(crate) fn save(&mut self, perm: Permission) {
        self.store.put_permission(perm);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checks
    // ─────────────────────────────────────────────────────────────────────────

    /// Fail with InvalidState unless `perm` is valid now for `country`.
    pub(crate) fn require_valid(&self, perm: &Permission, country: &str, role: &str) -> Result<()> {
        perm.check_valid(country, self.now).map_err(|e| {
            KeeperError::InvalidState(format!("{} permission {} is not valid: {}", role, perm.id, e))
        })
    }

    /// Fail with InsufficientFunds unless `account` holds `amount`.
    pub(crate) fn require_balance(&self, account: &AccountId, amount: u64) -> Result<()> {
        if amount > 0 && !self.deps.bank.has_balance(account, amount) {
            return Err(KeeperError::InsufficientFunds(format!(
                "{} cannot cover {}",
                account, amount
            )));
        }
        Ok(())
    }

    /// Is `account` the controller of the trust registry owning `schema_id`?
    pub(crate) fn is_trust_registry_controller(
        &self,
        account: &AccountId,
        schema_id: u64,
    ) -> Result<bool> {
        let schema = self.load_schema(schema_id)?;
        let registry = self.load_trust_registry(schema.tr_id)?;
        Ok(&registry.controller == account)
    }
}

/// Amounts enter the trust-deposit ledger as signed deltas.
pub(crate) fn signed(amount: u64) -> Result<i64> {
    i64::try_from(amount)
        .map_err(|_| KeeperError::InvalidArgument(format!("amount {} is too large", amount)))
}

/// Add to a deposit counter, failing instead of wrapping.
pub(crate) fn add_amount(current: u64, amount: u64, what: &str) -> Result<u64> {
    current
        .checked_add(amount)
        .ok_or_else(|| KeeperError::InvalidState(format!("{} overflow", what)))
}
