//! Test fixtures and tracking collaborators.
//!
//! The collaborators here keep real balances so integration tests can check
//! where every coin went. Trust-deposit adjustments are bookkeeping only:
//! they never move coins.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use trustperm::{
    BankKeeper, CollabResult, CollaboratorError, Collaborators, CredentialSchemaKeeper, Event,
    EventKind, EventSink, Keeper, KeeperConfig, SetPermissionVpToValidated, StartPermissionVp,
    TrustDepositKeeper, TrustRegistryKeeper,
};
use trustperm_core::{
    AccountId, CredentialSchema, Dec, PermManagementMode, Permission, PermissionId,
    PermissionType, Timestamp, TrustRegistry,
};
use trustperm_store::{MemoryStore, Store};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger
// ─────────────────────────────────────────────────────────────────────────────

/// One call into the bank or trust-deposit collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Movement {
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: u64,
    },
    ToModule {
        from: AccountId,
        module: String,
        amount: u64,
    },
    FromModule {
        module: String,
        to: AccountId,
        amount: u64,
    },
    Adjust {
        account: AccountId,
        delta: i64,
    },
    Burn {
        account: AccountId,
        amount: u64,
    },
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: BTreeMap<AccountId, u64>,
    modules: BTreeMap<String, u64>,
    deposits: BTreeMap<AccountId, i128>,
    movements: Vec<Movement>,
    /// Fail every movement once this many have been recorded.
    fail_after: Option<usize>,
}

impl LedgerState {
    fn check_injected_failure(&self) -> CollabResult<()> {
        match self.fail_after {
            Some(n) if self.movements.len() >= n => Err(CollaboratorError::Failed(format!(
                "injected failure after {} movements",
                n
            ))),
            _ => Ok(()),
        }
    }

    fn debit(&mut self, account: &AccountId, amount: u64) -> CollabResult<()> {
        let balance = self.balances.entry(account.clone()).or_default();
        if *balance < amount {
            return Err(CollaboratorError::InsufficientFunds(format!(
                "{} holds {}, needs {}",
                account, balance, amount
            )));
        }
        *balance -= amount;
        Ok(())
    }
}

/// Balances, module accounts and trust deposits shared by the tracking
/// collaborators of one fixture.
#[derive(Debug, Default)]
pub struct Ledger {
    state: Mutex<LedgerState>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `account` out of thin air.
    pub fn fund(&self, account: &AccountId, amount: u64) {
        *lock(&self.state).balances.entry(account.clone()).or_default() += amount;
    }

    pub fn balance(&self, account: &AccountId) -> u64 {
        lock(&self.state).balances.get(account).copied().unwrap_or(0)
    }

    pub fn module_balance(&self, module: &str) -> u64 {
        lock(&self.state).modules.get(module).copied().unwrap_or(0)
    }

    /// Net trust-deposit adjustments recorded for `account`.
    pub fn trust_deposit(&self, account: &AccountId) -> i128 {
        lock(&self.state).deposits.get(account).copied().unwrap_or(0)
    }

    /// Every movement recorded so far, oldest first.
    pub fn movements(&self) -> Vec<Movement> {
        lock(&self.state).movements.clone()
    }

    pub fn clear_movements(&self) {
        lock(&self.state).movements.clear();
    }

    /// Make every movement fail once `n` more have succeeded.
    pub fn fail_after(&self, n: usize) {
        let mut state = lock(&self.state);
        state.fail_after = Some(state.movements.len() + n);
    }

    pub fn stop_failing(&self) {
        lock(&self.state).fail_after = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Collaborators
// ─────────────────────────────────────────────────────────────────────────────

/// Bank that moves coins between ledger balances.
#[derive(Debug, Clone)]
pub struct TrackingBank {
    ledger: Arc<Ledger>,
}

impl TrackingBank {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }
}

impl BankKeeper for TrackingBank {
    fn send_coins(&self, from: &AccountId, to: &AccountId, amount: u64) -> CollabResult<()> {
        let mut state = lock(&self.ledger.state);
        state.check_injected_failure()?;
        state.debit(from, amount)?;
        *state.balances.entry(to.clone()).or_default() += amount;
        state.movements.push(Movement::Transfer {
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    fn send_coins_from_account_to_module(
        &self,
        from: &AccountId,
        module: &str,
        amount: u64,
    ) -> CollabResult<()> {
        let mut state = lock(&self.ledger.state);
        state.check_injected_failure()?;
        state.debit(from, amount)?;
        *state.modules.entry(module.to_string()).or_default() += amount;
        state.movements.push(Movement::ToModule {
            from: from.clone(),
            module: module.to_string(),
            amount,
        });
        Ok(())
    }

    fn send_coins_from_module_to_account(
        &self,
        module: &str,
        to: &AccountId,
        amount: u64,
    ) -> CollabResult<()> {
        let mut state = lock(&self.ledger.state);
        state.check_injected_failure()?;
        let held = state.modules.entry(module.to_string()).or_default();
        if *held < amount {
            return Err(CollaboratorError::InsufficientFunds(format!(
                "module {} holds {}, needs {}",
                module, held, amount
            )));
        }
        *held -= amount;
        *state.balances.entry(to.clone()).or_default() += amount;
        state.movements.push(Movement::FromModule {
            module: module.to_string(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    fn has_balance(&self, account: &AccountId, amount: u64) -> bool {
        self.ledger.balance(account) >= amount
    }
}

/// Reward and deposit rates served by [`TrackingTrustDeposit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rates {
    pub trust_deposit: Dec,
    pub user_agent_reward: Dec,
    pub wallet_user_agent_reward: Dec,
}

impl Default for Rates {
    /// 20% deposit, 10% user agent, 5% wallet agent.
    fn default() -> Self {
        Self {
            trust_deposit: Dec::from_bps(2_000),
            user_agent_reward: Dec::from_bps(1_000),
            wallet_user_agent_reward: Dec::from_bps(500),
        }
    }
}

/// Trust-deposit ledger that records adjustments and burns.
#[derive(Debug)]
pub struct TrackingTrustDeposit {
    ledger: Arc<Ledger>,
    rates: Mutex<Rates>,
}

impl TrackingTrustDeposit {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            rates: Mutex::new(Rates::default()),
        }
    }

    pub fn set_rates(&self, rates: Rates) {
        *lock(&self.rates) = rates;
    }
}

impl TrustDepositKeeper for TrackingTrustDeposit {
    fn adjust_trust_deposit(&self, account: &AccountId, delta: i64) -> CollabResult<()> {
        let mut state = lock(&self.ledger.state);
        state.check_injected_failure()?;
        *state.deposits.entry(account.clone()).or_default() += i128::from(delta);
        state.movements.push(Movement::Adjust {
            account: account.clone(),
            delta,
        });
        Ok(())
    }

    fn burn_ecosystem_slashed_trust_deposit(&self, account: &AccountId, amount: u64) -> CollabResult<()> {
        let mut state = lock(&self.ledger.state);
        state.check_injected_failure()?;
        *state.deposits.entry(account.clone()).or_default() -= i128::from(amount);
        state.movements.push(Movement::Burn {
            account: account.clone(),
            amount,
        });
        Ok(())
    }

    fn trust_deposit_rate(&self) -> Dec {
        lock(&self.rates).trust_deposit
    }

    fn user_agent_reward_rate(&self) -> Dec {
        lock(&self.rates).user_agent_reward
    }

    fn wallet_user_agent_reward_rate(&self) -> Dec {
        lock(&self.rates).wallet_user_agent_reward
    }
}

/// In-memory credential schemas.
#[derive(Debug, Default)]
pub struct MockSchemaKeeper {
    schemas: Mutex<BTreeMap<u64, CredentialSchema>>,
}

impl MockSchemaKeeper {
    pub fn insert(&self, schema: CredentialSchema) {
        lock(&self.schemas).insert(schema.id, schema);
    }
}

impl CredentialSchemaKeeper for MockSchemaKeeper {
    fn credential_schema(&self, id: u64) -> CollabResult<Option<CredentialSchema>> {
        Ok(lock(&self.schemas).get(&id).cloned())
    }
}

/// In-memory trust registries and a settable trust unit price.
#[derive(Debug)]
pub struct MockTrustRegistryKeeper {
    registries: Mutex<BTreeMap<u64, TrustRegistry>>,
    trust_unit_price: Mutex<u64>,
}

impl Default for MockTrustRegistryKeeper {
    fn default() -> Self {
        Self {
            registries: Mutex::new(BTreeMap::new()),
            trust_unit_price: Mutex::new(1),
        }
    }
}

impl MockTrustRegistryKeeper {
    pub fn insert(&self, registry: TrustRegistry) {
        lock(&self.registries).insert(registry.id, registry);
    }

    pub fn set_trust_unit_price(&self, price: u64) {
        *lock(&self.trust_unit_price) = price;
    }
}

impl TrustRegistryKeeper for MockTrustRegistryKeeper {
    fn trust_registry(&self, id: u64) -> CollabResult<Option<TrustRegistry>> {
        Ok(lock(&self.registries).get(&id).cloned())
    }

    fn trust_unit_price(&self) -> u64 {
        *lock(&self.trust_unit_price)
    }
}

/// Event sink that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingEventSink {
    pub fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        lock(&self.events).iter().map(|e| e.kind).collect()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: Event) {
        lock(&self.events).push(event);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixture
// ─────────────────────────────────────────────────────────────────────────────

/// Terms an applicant asks for and its validator confirms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Terms {
    pub validation_fees: u64,
    pub issuance_fees: u64,
    pub verification_fees: u64,
    pub issuance_fee_discount: u64,
    pub verification_fee_discount: u64,
    pub country: String,
}

impl Terms {
    pub fn issuance(fees: u64) -> Self {
        Self {
            issuance_fees: fees,
            ..Self::default()
        }
    }

    pub fn verification(fees: u64) -> Self {
        Self {
            verification_fees: fees,
            ..Self::default()
        }
    }

    pub fn validation(fees: u64) -> Self {
        Self {
            validation_fees: fees,
            ..Self::default()
        }
    }
}

/// A keeper wired to tracking collaborators.
pub struct TestFixture<S: Store = MemoryStore> {
    pub keeper: Keeper<S>,
    pub ledger: Arc<Ledger>,
    pub schemas: Arc<MockSchemaKeeper>,
    pub registries: Arc<MockTrustRegistryKeeper>,
    pub trust_deposit: Arc<TrackingTrustDeposit>,
    pub events: Arc<RecordingEventSink>,
}

impl TestFixture<MemoryStore> {
    /// Fixture over a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store> TestFixture<S> {
    pub fn with_store(store: S) -> Self {
        let ledger = Arc::new(Ledger::new());
        let schemas = Arc::new(MockSchemaKeeper::default());
        let registries = Arc::new(MockTrustRegistryKeeper::default());
        let trust_deposit = Arc::new(TrackingTrustDeposit::new(ledger.clone()));
        let events = Arc::new(RecordingEventSink::default());

        let deps = Collaborators {
            schemas: schemas.clone(),
            registries: registries.clone(),
            trust_deposit: trust_deposit.clone(),
            bank: Arc::new(TrackingBank::new(ledger.clone())),
        };
        let keeper = Keeper::new(store, deps, KeeperConfig::default()).with_event_sink(events.clone());

        Self {
            keeper,
            ledger,
            schemas,
            registries,
            trust_deposit,
            events,
        }
    }

    pub fn fund(&self, account: &str, amount: u64) {
        self.ledger.fund(&AccountId::from(account), amount);
    }

    pub fn balance(&self, account: &str) -> u64 {
        self.ledger.balance(&AccountId::from(account))
    }

    /// Register trust registry `tr_id` and schema `schema_id` with
    /// validity periods of one year for grantors and 180 days otherwise.
    pub fn add_schema(
        &self,
        tr_id: u64,
        schema_id: u64,
        controller: &str,
        issuer_mode: PermManagementMode,
        verifier_mode: PermManagementMode,
    ) -> CredentialSchema {
        self.registries.insert(TrustRegistry {
            id: tr_id,
            controller: AccountId::from(controller),
        });
        let schema = CredentialSchema {
            id: schema_id,
            tr_id,
            issuer_perm_management_mode: issuer_mode,
            verifier_perm_management_mode: verifier_mode,
            issuer_grantor_validation_validity_period: 365,
            verifier_grantor_validation_validity_period: 365,
            issuer_validation_validity_period: 180,
            verifier_validation_validity_period: 180,
            holder_validation_validity_period: 180,
        };
        self.schemas.insert(schema.clone());
        schema
    }

    /// Create the ECOSYSTEM root of `schema_id` as its registry controller.
    pub fn create_root(
        &self,
        now: Timestamp,
        schema_id: u64,
        controller: &str,
        terms: &Terms,
    ) -> trustperm::Result<PermissionId> {
        self.keeper.create_root_permission(
            now,
            trustperm::CreateRootPermission {
                creator: AccountId::from(controller),
                schema_id,
                did: Some(format!("did:example:{}", controller)),
                country: terms.country.clone(),
                effective_from: None,
                effective_until: None,
                validation_fees: terms.validation_fees,
                issuance_fees: terms.issuance_fees,
                verification_fees: terms.verification_fees,
            },
        )
    }

    /// Run a full validation process: fund the applicant for the escrow,
    /// start the request and have the validator accept `terms`.
    pub fn grant(
        &self,
        now: Timestamp,
        perm_type: PermissionType,
        validator_id: PermissionId,
        grantee: &str,
        terms: &Terms,
    ) -> trustperm::Result<PermissionId> {
        let validator = self.keeper.get_permission(validator_id)?;
        let fees = validator.validation_fees * self.registries.trust_unit_price();
        let deposit = Dec::from_int(fees)
            .checked_mul(self.trust_deposit.trust_deposit_rate())?
            .truncate()?;
        self.fund(grantee, fees + deposit);

        let id = self.keeper.start_permission_vp(
            now,
            StartPermissionVp {
                creator: AccountId::from(grantee),
                perm_type,
                validator_perm_id: validator_id,
                country: terms.country.clone(),
                did: Some(format!("did:example:{}", grantee)),
                validation_fees: Some(terms.validation_fees),
                issuance_fees: Some(terms.issuance_fees),
                verification_fees: Some(terms.verification_fees),
            },
        )?;
        self.keeper.set_permission_vp_to_validated(
            now,
            validation_msg(&validator.grantee, id, terms),
        )?;
        Ok(id)
    }

    pub fn permission(&self, id: PermissionId) -> trustperm::Result<Permission> {
        self.keeper.get_permission(id)
    }

    /// Build [`PermissionTree`] on schema [`TREE_SCHEMA_ID`] at `now`.
    ///
    /// Both sides use GRANTOR_VALIDATION. Fees, in trust units:
    ///
    /// | permission         | validation | issuance | verification |
    /// |--------------------|-----------:|---------:|-------------:|
    /// | ecosystem          |         10 |      100 |           60 |
    /// | issuer grantor     |         20 |       50 |            0 |
    /// | verifier grantor   |          0 |        0 |           30 |
    ///
    /// The issuer grantor may hand out up to 50% issuance discount.
    pub fn build_tree(&self, now: Timestamp) -> trustperm::Result<PermissionTree> {
        self.add_schema(
            1,
            TREE_SCHEMA_ID,
            TREE_CONTROLLER,
            PermManagementMode::GrantorValidation,
            PermManagementMode::GrantorValidation,
        );
        let ecosystem = self.create_root(
            now,
            TREE_SCHEMA_ID,
            TREE_CONTROLLER,
            &Terms {
                validation_fees: 10,
                issuance_fees: 100,
                verification_fees: 60,
                ..Terms::default()
            },
        )?;

        let issuer_grantor = self.grant(
            now,
            PermissionType::IssuerGrantor,
            ecosystem,
            "issuer-grantor",
            &Terms {
                validation_fees: 20,
                issuance_fees: 50,
                issuance_fee_discount: 5_000,
                ..Terms::default()
            },
        )?;
        let verifier_grantor = self.grant(
            now,
            PermissionType::VerifierGrantor,
            ecosystem,
            "verifier-grantor",
            &Terms::verification(30),
        )?;

        let issuer = self.grant(now, PermissionType::Issuer, issuer_grantor, "issuer", &Terms::default())?;
        let verifier = self.grant(
            now,
            PermissionType::Verifier,
            verifier_grantor,
            "verifier",
            &Terms::default(),
        )?;
        let agent = self.grant(now, PermissionType::Issuer, issuer_grantor, "agent", &Terms::default())?;
        let wallet_agent = self.grant(
            now,
            PermissionType::Issuer,
            issuer_grantor,
            "wallet-agent",
            &Terms::default(),
        )?;

        Ok(PermissionTree {
            ecosystem,
            issuer_grantor,
            verifier_grantor,
            issuer,
            verifier,
            agent,
            wallet_agent,
        })
    }
}

/// Schema used by [`TestFixture::build_tree`].
pub const TREE_SCHEMA_ID: u64 = 10;

/// Controller of the trust registry owning [`TREE_SCHEMA_ID`].
pub const TREE_CONTROLLER: &str = "tr-controller";

/// Ids of a complete two-sided permission tree.
///
/// Issuer, agent and wallet agent are validated by the issuer grantor; the
/// verifier by the verifier grantor. Every permission's grantee is named
/// after its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionTree {
    pub ecosystem: PermissionId,
    pub issuer_grantor: PermissionId,
    pub verifier_grantor: PermissionId,
    pub issuer: PermissionId,
    pub verifier: PermissionId,
    pub agent: PermissionId,
    pub wallet_agent: PermissionId,
}

impl PermissionTree {
    /// An issuance session paid by the issuer's grantee.
    pub fn issuance(&self, id: &str) -> trustperm::CreateOrUpdatePermissionSession {
        trustperm::CreateOrUpdatePermissionSession {
            creator: AccountId::from("issuer"),
            id: id.to_string(),
            issuer_perm_id: Some(self.issuer),
            verifier_perm_id: None,
            agent_perm_id: self.agent,
            wallet_agent_perm_id: Some(self.wallet_agent),
        }
    }

    /// A verification session paid by the verifier's grantee.
    pub fn verification(&self, id: &str) -> trustperm::CreateOrUpdatePermissionSession {
        trustperm::CreateOrUpdatePermissionSession {
            creator: AccountId::from("verifier"),
            id: id.to_string(),
            issuer_perm_id: Some(self.issuer),
            verifier_perm_id: Some(self.verifier),
            agent_perm_id: self.agent,
            wallet_agent_perm_id: Some(self.wallet_agent),
        }
    }
}

/// The acceptance message a validator sends for `terms`.
pub fn validation_msg(validator: &AccountId, id: PermissionId, terms: &Terms) -> SetPermissionVpToValidated {
    SetPermissionVpToValidated {
        creator: validator.clone(),
        id,
        validation_fees: terms.validation_fees,
        issuance_fees: terms.issuance_fees,
        verification_fees: terms.verification_fees,
        issuance_fee_discount: terms.issuance_fee_discount,
        verification_fee_discount: terms.verification_fee_discount,
        country: terms.country.clone(),
        effective_until: None,
        vp_summary_digest_sri: None,
    }
}

/// A fresh random session id.
pub fn session_id() -> String {
    format!("session-{:016x}", rand::random::<u64>())
}
