//! Minimal collaborators for unit tests inside this crate.
//!
//! Integration tests use the tracking collaborators in `trustperm-testkit`.

use std::sync::Arc;

use trustperm_core::{
    AccountId, CredentialSchema, Dec, PermManagementMode, Permission, PermissionId,
    PermissionType, TrustRegistry, VpState,
};
use trustperm_store::{MemoryStore, Store, WriteBatch};

use crate::collaborators::{
    BankKeeper, CollabResult, Collaborators, CredentialSchemaKeeper, TrustDepositKeeper,
    TrustRegistryKeeper,
};
use crate::config::KeeperConfig;
use crate::keeper::Keeper;

pub(crate) const SCHEMA_ID: u64 = 7;

pub(crate) fn test_schema() -> CredentialSchema {
    CredentialSchema {
        id: SCHEMA_ID,
        tr_id: 1,
        issuer_perm_management_mode: PermManagementMode::GrantorValidation,
        verifier_perm_management_mode: PermManagementMode::GrantorValidation,
        issuer_grantor_validation_validity_period: 365,
        verifier_grantor_validation_validity_period: 365,
        issuer_validation_validity_period: 180,
        verifier_validation_validity_period: 180,
        holder_validation_validity_period: 90,
    }
}

struct StaticSchemas(CredentialSchema);

impl CredentialSchemaKeeper for StaticSchemas {
    fn credential_schema(&self, id: u64) -> CollabResult<Option<CredentialSchema>> {
        Ok((id == self.0.id).then(|| self.0.clone()))
    }
}

struct StaticRegistry;

impl TrustRegistryKeeper for StaticRegistry {
    fn trust_registry(&self, id: u64) -> CollabResult<Option<TrustRegistry>> {
        Ok((id == 1).then(|| TrustRegistry {
            id,
            controller: AccountId::from("tr-controller"),
        }))
    }

    fn trust_unit_price(&self) -> u64 {
        1
    }
}

struct NullTrustDeposit;

impl TrustDepositKeeper for NullTrustDeposit {
    fn adjust_trust_deposit(&self, _: &AccountId, _: i64) -> CollabResult<()> {
        Ok(())
    }

    fn burn_ecosystem_slashed_trust_deposit(&self, _: &AccountId, _: u64) -> CollabResult<()> {
        Ok(())
    }

    fn trust_deposit_rate(&self) -> Dec {
        Dec::from_bps(2_000)
    }

    fn user_agent_reward_rate(&self) -> Dec {
        Dec::from_bps(1_000)
    }

    fn wallet_user_agent_reward_rate(&self) -> Dec {
        Dec::from_bps(500)
    }
}

struct NullBank;

impl BankKeeper for NullBank {
    fn send_coins(&self, _: &AccountId, _: &AccountId, _: u64) -> CollabResult<()> {
        Ok(())
    }

    fn send_coins_from_account_to_module(&self, _: &AccountId, _: &str, _: u64) -> CollabResult<()> {
        Ok(())
    }

    fn send_coins_from_module_to_account(&self, _: &str, _: &AccountId, _: u64) -> CollabResult<()> {
        Ok(())
    }

    fn has_balance(&self, _: &AccountId, _: u64) -> bool {
        true
    }
}

/// A validated permission of schema [`SCHEMA_ID`].
pub(crate) fn permission(
    id: u64,
    perm_type: PermissionType,
    validator: Option<u64>,
    grantee: &str,
) -> Permission {
    let mut perm = Permission::new(
        PermissionId(id),
        perm_type,
        SCHEMA_ID,
        AccountId::from(grantee),
        0,
    );
    perm.validator_perm_id = validator.map(PermissionId);
    perm.vp_state = VpState::Validated;
    perm
}

pub(crate) fn seeded_store(perms: Vec<Permission>) -> MemoryStore {
    let store = MemoryStore::new();
    let mut batch = WriteBatch::new();
    batch.last_permission_id = perms.iter().map(|p| p.id.get()).max();
    for perm in perms {
        batch.put_permission(perm);
    }
    store.commit(batch).unwrap();
    store
}

pub(crate) fn keeper_with_schema(store: MemoryStore, schema: CredentialSchema) -> Keeper<MemoryStore> {
    let deps = Collaborators {
        schemas: Arc::new(StaticSchemas(schema)),
        registries: Arc::new(StaticRegistry),
        trust_deposit: Arc::new(NullTrustDeposit),
        bank: Arc::new(NullBank),
    };
    Keeper::new(store, deps, KeeperConfig::default())
}

pub(crate) fn keeper_with(store: MemoryStore) -> Keeper<MemoryStore> {
    keeper_with_schema(store, test_schema())
}
