//! Permissions created outside the validation process, and the authority
//! actions that apply to every permission: extend, revoke, slash, repay.

use trustperm_core::{
    is_valid_country_code, is_valid_did, PermManagementMode, Permission, PermissionId,
    PermissionType, Timestamp, VpState,
};
use trustperm_store::Store;

use crate::error::{KeeperError, Result};
use crate::events::{Event, EventKind};
use crate::keeper::{add_amount, signed, Keeper, Tx};
use crate::msgs::{
    CreatePermission, CreateRootPermission, ExtendPermission, RepayPermissionSlashedTrustDeposit,
    RevokePermission, SlashPermissionTrustDeposit,
};

/// Checks shared by the self-service creation paths.
fn check_new_permission_fields(
    now: Timestamp,
    did: Option<&str>,
    country: &str,
    effective_from: Option<Timestamp>,
    effective_until: Option<Timestamp>,
) -> Result<()> {
    if !country.is_empty() && !is_valid_country_code(country) {
        return Err(KeeperError::InvalidArgument(format!(
            "invalid country code: {}",
            country
        )));
    }
    if let Some(did) = did {
        if !is_valid_did(did) {
            return Err(KeeperError::InvalidArgument(format!("invalid DID: {}", did)));
        }
    }
    if let Some(from) = effective_from {
        if from <= now {
            return Err(KeeperError::InvalidArgument(
                "effective_from must be in the future".into(),
            ));
        }
    }
    if let Some(until) = effective_until {
        if until <= effective_from.unwrap_or(now) {
            return Err(KeeperError::InvalidArgument(
                "effective_until must be greater than effective_from".into(),
            ));
        }
    }
    Ok(())
}

impl<S: Store> Tx<'_, S> {
    pub(crate) fn create_root_permission(&mut self, msg: &CreateRootPermission) -> Result<PermissionId> {
        let schema = self.load_schema(msg.schema_id)?;
        check_new_permission_fields(
            self.now,
            msg.did.as_deref(),
            &msg.country,
            msg.effective_from,
            msg.effective_until,
        )?;

        if !self.is_trust_registry_controller(&msg.creator, schema.id)? {
            return Err(KeeperError::Unauthorized(
                "creator is not the trust registry controller".into(),
            ));
        }
        if let Some(existing) = self.find_ecosystem_permission(schema.id)? {
            return Err(KeeperError::Conflict(format!(
                "schema {} already has ecosystem permission {}",
                schema.id, existing.id
            )));
        }

        let id = self.store.next_permission_id()?;
        let mut perm = Permission::new(
            id,
            PermissionType::Ecosystem,
            schema.id,
            msg.creator.clone(),
            self.now,
        );
        perm.did = msg.did.clone();
        perm.country = msg.country.clone();
        perm.effective_from = msg.effective_from;
        perm.effective_until = msg.effective_until;
        perm.validation_fees = msg.validation_fees;
        perm.issuance_fees = msg.issuance_fees;
        perm.verification_fees = msg.verification_fees;
        perm.vp_state = VpState::Validated;
        self.save(perm);

        tracing::info!(permission = %id, schema = schema.id, "created ecosystem permission");
        self.emit(
            Event::new(EventKind::CreateRootPermission)
                .attr("permission_id", id)
                .attr("schema_id", schema.id)
                .attr("creator", &msg.creator),
        );
        Ok(id)
    }

    pub(crate) fn create_permission(&mut self, msg: &CreatePermission) -> Result<PermissionId> {
        if !matches!(msg.perm_type, PermissionType::Issuer | PermissionType::Verifier) {
            return Err(KeeperError::InvalidArgument(format!(
                "only ISSUER or VERIFIER permissions can be self-created, got {}",
                msg.perm_type
            )));
        }
        check_new_permission_fields(
            self.now,
            msg.did.as_deref(),
            &msg.country,
            msg.effective_from,
            msg.effective_until,
        )?;

        let schema = self.load_schema(msg.schema_id)?;
        let mode = if msg.perm_type == PermissionType::Issuer {
            schema.issuer_perm_management_mode
        } else {
            schema.verifier_perm_management_mode
        };
        if mode != PermManagementMode::Open {
            return Err(KeeperError::InvalidArgument(format!(
                "{} management mode of schema {} is {}, not OPEN",
                msg.perm_type, schema.id, mode
            )));
        }

        let ecosystem = self.find_ecosystem_permission(schema.id)?.ok_or_else(|| {
            KeeperError::NotFound(format!("no ecosystem permission for schema {}", schema.id))
        })?;

        let id = self.store.next_permission_id()?;
        let mut perm = Permission::new(id, msg.perm_type, schema.id, msg.creator.clone(), self.now);
        perm.did = msg.did.clone();
        perm.country = msg.country.clone();
        perm.effective_from = msg.effective_from;
        perm.effective_until = msg.effective_until;
        perm.validator_perm_id = Some(ecosystem.id);
        perm.verification_fees = msg.verification_fees;
        perm.vp_state = VpState::Validated;
        self.save(perm);

        tracing::info!(permission = %id, schema = schema.id, perm_type = %msg.perm_type, "created open permission");
        self.emit(
            Event::new(EventKind::CreatePermission)
                .attr("permission_id", id)
                .attr("schema_id", schema.id)
                .attr("creator", &msg.creator),
        );
        Ok(id)
    }

    pub(crate) fn extend_permission(&mut self, msg: &ExtendPermission) -> Result<()> {
        let mut perm = self.load_permission(msg.id, "extended")?;
        self.require_valid(&perm, &perm.country, "extended")?;

        let current = perm.effective_until.ok_or_else(|| {
            KeeperError::InvalidState(format!(
                "permission {} has no effective_until to extend",
                perm.id
            ))
        })?;
        if msg.effective_until <= current {
            return Err(KeeperError::InvalidArgument(
                "effective_until must be greater than current effective_until".into(),
            ));
        }

        let grantee_only = match perm.validator_perm_id {
            None => true,
            Some(validator_id) => {
                let validator = self.load_permission(validator_id, "validator")?;
                self.require_valid(&validator, &validator.country, "validator")?;
                if validator.perm_type == PermissionType::Ecosystem {
                    true
                } else {
                    if perm.vp_exp.is_some_and(|exp| msg.effective_until > exp) {
                        return Err(KeeperError::InvalidArgument(
                            "effective_until cannot be after validation expiration".into(),
                        ));
                    }
                    if validator.grantee != msg.creator {
                        return Err(KeeperError::Unauthorized(
                            "creator is not the validator permission grantee".into(),
                        ));
                    }
                    false
                }
            }
        };
        if grantee_only && perm.grantee != msg.creator {
            return Err(KeeperError::Unauthorized(
                "creator is not the permission grantee".into(),
            ));
        }

        perm.effective_until = Some(msg.effective_until);
        perm.extended = Some(self.now);
        perm.extended_by = Some(msg.creator.clone());
        perm.modified = self.now;
        let id = perm.id;
        self.save(perm);

        tracing::info!(permission = %id, effective_until = msg.effective_until, "extended permission");
        self.emit(
            Event::new(EventKind::ExtendPermission)
                .attr("permission_id", id)
                .attr("effective_until", msg.effective_until)
                .attr("extended_by", &msg.creator),
        );
        Ok(())
    }

    pub(crate) fn revoke_permission(&mut self, msg: &RevokePermission) -> Result<()> {
        let mut perm = self.load_permission(msg.id, "revoked")?;
        self.require_valid(&perm, &perm.country, "revoked")?;

        let authorized = perm.grantee == msg.creator
            || self.is_valid_ancestor_grantee(&msg.creator, &perm)?
            || self.is_trust_registry_controller(&msg.creator, perm.schema_id)?;
        if !authorized {
            return Err(KeeperError::Unauthorized(
                "creator does not have authority to revoke this permission".into(),
            ));
        }

        perm.revoked = Some(self.now);
        perm.revoked_by = Some(msg.creator.clone());
        perm.modified = self.now;
        let id = perm.id;
        self.save(perm);

        tracing::info!(permission = %id, revoked_by = %msg.creator, "revoked permission");
        self.emit(
            Event::new(EventKind::RevokePermission)
                .attr("permission_id", id)
                .attr("revoked_by", &msg.creator),
        );
        Ok(())
    }

    pub(crate) fn slash_permission_trust_deposit(
        &mut self,
        msg: &SlashPermissionTrustDeposit,
    ) -> Result<()> {
        if msg.amount == 0 {
            return Err(KeeperError::InvalidArgument("slash amount must be positive".into()));
        }
        let mut perm = self.load_permission(msg.id, "slashed")?;
        if msg.amount > perm.deposit {
            return Err(KeeperError::InvalidArgument(format!(
                "amount exceeds available deposit: {} > {}",
                msg.amount, perm.deposit
            )));
        }

        let authorized = self.is_valid_ancestor_grantee(&msg.creator, &perm)?
            || self.is_trust_registry_controller(&msg.creator, perm.schema_id)?;
        if !authorized {
            return Err(KeeperError::Unauthorized(
                "creator does not have authority to slash this permission".into(),
            ));
        }

        self.deps
            .trust_deposit
            .burn_ecosystem_slashed_trust_deposit(&perm.grantee, msg.amount)?;

        perm.slashed_deposit = add_amount(perm.slashed_deposit, msg.amount, "slashed deposit")?;
        perm.slashed = Some(self.now);
        perm.slashed_by = Some(msg.creator.clone());
        perm.modified = self.now;
        let id = perm.id;
        self.save(perm);

        tracing::info!(permission = %id, amount = msg.amount, slashed_by = %msg.creator, "slashed trust deposit");
        self.emit(
            Event::new(EventKind::SlashPermissionTrustDeposit)
                .attr("permission_id", id)
                .attr("amount", msg.amount)
                .attr("slashed_by", &msg.creator),
        );
        Ok(())
    }

    pub(crate) fn repay_permission_slashed_trust_deposit(
        &mut self,
        msg: &RepayPermissionSlashedTrustDeposit,
    ) -> Result<u64> {
        let mut perm = self.load_permission(msg.id, "slashed")?;
        if perm.slashed_deposit == 0 {
            return Err(KeeperError::InvalidState(format!(
                "permission {} has no slashed deposit to repay",
                perm.id
            )));
        }
        let amount = perm.outstanding_slash();
        if amount == 0 {
            return Err(KeeperError::InvalidState(format!(
                "slashed deposit of permission {} is already repaid",
                perm.id
            )));
        }
        self.require_balance(&msg.creator, amount)?;

        self.deps.bank.send_coins_from_account_to_module(
            &msg.creator,
            &self.config.trust_deposit_module,
            amount,
        )?;
        self.deps
            .trust_deposit
            .adjust_trust_deposit(&perm.grantee, signed(amount)?)?;

        perm.repaid_deposit = amount;
        perm.repaid = Some(self.now);
        perm.repaid_by = Some(msg.creator.clone());
        perm.modified = self.now;
        let id = perm.id;
        self.save(perm);

        tracing::info!(permission = %id, amount, repaid_by = %msg.creator, "repaid slashed deposit");
        self.emit(
            Event::new(EventKind::RepayPermissionSlashedTrustDeposit)
                .attr("permission_id", id)
                .attr("amount", amount)
                .attr("repaid_by", &msg.creator),
        );
        Ok(amount)
    }
}

impl<S: Store> Keeper<S> {
    // ─────────────────────────────────────────────────────────────────────────
    // Creation
    // ─────────────────────────────────────────────────────────────────────────

    /// Create the ECOSYSTEM root of a schema. Only the trust registry
    /// controller may call this, once per schema.
    pub fn create_root_permission(&self, now: Timestamp, msg: CreateRootPermission) -> Result<PermissionId> {
        self.transact(now, |tx| tx.create_root_permission(&msg))
    }

    /// Self-create an ISSUER or VERIFIER permission on an OPEN schema.
    pub fn create_permission(&self, now: Timestamp, msg: CreatePermission) -> Result<PermissionId> {
        self.transact(now, |tx| tx.create_permission(&msg))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authority
    // ─────────────────────────────────────────────────────────────────────────

    pub fn extend_permission(&self, now: Timestamp, msg: ExtendPermission) -> Result<()> {
        self.transact(now, |tx| tx.extend_permission(&msg))
    }

    pub fn revoke_permission(&self, now: Timestamp, msg: RevokePermission) -> Result<()> {
        self.transact(now, |tx| tx.revoke_permission(&msg))
    }

    /// Burn part of a permission's deposit. The permission stays invalid
    /// until the slash is repaid.
    pub fn slash_permission_trust_deposit(
        &self,
        now: Timestamp,
        msg: SlashPermissionTrustDeposit,
    ) -> Result<()> {
        self.transact(now, |tx| tx.slash_permission_trust_deposit(&msg))
    }

    /// Repay the outstanding slash. Returns the amount paid.
    pub fn repay_permission_slashed_trust_deposit(
        &self,
        now: Timestamp,
        msg: RepayPermissionSlashedTrustDeposit,
    ) -> Result<u64> {
        self.transact(now, |tx| tx.repay_permission_slashed_trust_deposit(&msg))
    }
}
