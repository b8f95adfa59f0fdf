//! The validation process (VP) of a permission.
//!
//! ```text
//!             start / renew                set_validated
//!   (none) ──────────────────▶ PENDING ─────────────────▶ VALIDATED
//!                                 │  ▲                      │    │
//!                    cancel       │  └──────── renew ───────┘    │ terminate
//!       (never validated) ◀───────┤                              ▼
//!          TERMINATED             └── cancel (validated before) ─▶ VALIDATED
//! ```
//!
//! Applicants escrow the validator's validation fees and lock a trust
//! deposit when a request starts. The escrow goes to the validator on
//! acceptance and back to the applicant on cancellation.

use trustperm_core::{
    is_valid_country_code, is_valid_did, AccountId, CredentialSchema, Dec, PermManagementMode,
    Permission, PermissionId, PermissionType, VpState, DAY_MILLIS, MAX_DISCOUNT_BPS,
};
use trustperm_store::Store;

use crate::error::{KeeperError, Result};
use crate::events::{Event, EventKind};
use crate::keeper::{add_amount, signed, Keeper, Tx};
use crate::msgs::{
    CancelPermissionVpLastRequest, RenewPermissionVp, SetPermissionVpToValidated,
    StartPermissionVp, TerminatePermissionVp,
};

/// Validator type required for an applicant of `requested` type on `schema`.
pub fn required_validator_type(
    requested: PermissionType,
    schema: &CredentialSchema,
) -> Result<PermissionType> {
    use PermManagementMode as Mode;
    use PermissionType as T;

    let grantor_only = |mode: Mode, side: &str| {
        if mode == Mode::GrantorValidation {
            Ok(T::Ecosystem)
        } else {
            Err(KeeperError::InvalidArgument(format!(
                "{} grantor permissions require GRANTOR_VALIDATION {} mode, schema uses {}",
                side, side, mode
            )))
        }
    };
    let by_mode = |mode: Mode, grantor: T, side: &str| match mode {
        Mode::GrantorValidation => Ok(grantor),
        Mode::Ecosystem => Ok(T::Ecosystem),
        Mode::Open => Err(KeeperError::InvalidArgument(format!(
            "{} permissions of OPEN schemas are self-created, not validated",
            side
        ))),
    };

    match requested {
        T::Ecosystem => Err(KeeperError::InvalidArgument(
            "ECOSYSTEM permissions are created as schema roots".into(),
        )),
        T::IssuerGrantor => grantor_only(schema.issuer_perm_management_mode, "issuer"),
        T::VerifierGrantor => grantor_only(schema.verifier_perm_management_mode, "verifier"),
        T::Issuer => by_mode(schema.issuer_perm_management_mode, T::IssuerGrantor, "issuer"),
        T::Verifier => by_mode(schema.verifier_perm_management_mode, T::VerifierGrantor, "verifier"),
        T::Holder => Ok(T::Issuer),
    }
}

impl<S: Store> Tx<'_, S> {
    /// Fees to escrow and deposit to lock for a request validated by `validator`.
    fn validation_escrow(&self, validator: &Permission) -> Result<(u64, u64)> {
        let price = self.deps.registries.trust_unit_price();
        let fees = validator.validation_fees.checked_mul(price).ok_or_else(|| {
            KeeperError::InvalidArgument("validation fees overflow".into())
        })?;
        let deposit = Dec::from_int(fees)
            .checked_mul(self.deps.trust_deposit.trust_deposit_rate())?
            .truncate()?;
        Ok((fees, deposit))
    }

    /// Move `fees` into escrow and lock `deposit` for `applicant`.
    fn escrow(&mut self, applicant: &AccountId, fees: u64, deposit: u64) -> Result<()> {
        let total = add_amount(fees, deposit, "validation escrow")?;
        self.require_balance(applicant, total)?;

        if fees > 0 {
            self.deps.bank.send_coins_from_account_to_module(
                applicant,
                &self.config.escrow_module,
                fees,
            )?;
        }
        if deposit > 0 {
            self.deps
                .trust_deposit
                .adjust_trust_deposit(applicant, signed(deposit)?)?;
        }
        Ok(())
    }

    pub(crate) fn start_permission_vp(&mut self, msg: &StartPermissionVp) -> Result<PermissionId> {
        if !msg.country.is_empty() && !is_valid_country_code(&msg.country) {
            return Err(KeeperError::InvalidArgument(format!(
                "invalid country code: {}",
                msg.country
            )));
        }
        if let Some(did) = &msg.did {
            if !is_valid_did(did) {
                return Err(KeeperError::InvalidArgument(format!("invalid DID: {}", did)));
            }
        }

        let validator = self.load_permission(msg.validator_perm_id, "validator")?;
        self.require_valid(&validator, &msg.country, "validator")?;

        let schema = self.load_schema(validator.schema_id)?;
        let required = required_validator_type(msg.perm_type, &schema)?;
        if validator.perm_type != required {
            return Err(KeeperError::InvalidArgument(format!(
                "{} permission requires {} validator, got {}",
                msg.perm_type, required, validator.perm_type
            )));
        }

        let (fees, deposit) = self.validation_escrow(&validator)?;
        self.escrow(&msg.creator, fees, deposit)?;

        let id = self.store.next_permission_id()?;
        let mut perm = Permission::new(
            id,
            msg.perm_type,
            validator.schema_id,
            msg.creator.clone(),
            self.now,
        );
        perm.did = msg.did.clone();
        perm.country = msg.country.clone();
        perm.validator_perm_id = Some(validator.id);
        perm.vp_state = VpState::Pending;
        perm.vp_current_fees = fees;
        perm.vp_current_deposit = deposit;
        perm.deposit = deposit;
        perm.validation_fees = msg.validation_fees.unwrap_or(0);
        perm.issuance_fees = msg.issuance_fees.unwrap_or(0);
        perm.verification_fees = msg.verification_fees.unwrap_or(0);
        self.save(perm);

        tracing::info!(permission = %id, validator = %validator.id, fees, deposit, "started validation process");
        self.emit(
            Event::new(EventKind::StartPermissionVp)
                .attr("permission_id", id)
                .attr("creator", &msg.creator)
                .attr("validator_perm_id", validator.id)
                .attr("fees", fees)
                .attr("deposit", deposit),
        );
        Ok(id)
    }

    pub(crate) fn renew_permission_vp(&mut self, msg: &RenewPermissionVp) -> Result<()> {
        let mut perm = self.load_permission(msg.id, "applicant")?;
        if perm.grantee != msg.creator {
            return Err(KeeperError::Unauthorized(
                "only the permission grantee can renew".into(),
            ));
        }
        if perm.vp_state != VpState::Validated {
            return Err(KeeperError::InvalidState(format!(
                "permission {} must be VALIDATED to renew, is {}",
                perm.id, perm.vp_state
            )));
        }

        let validator_id = perm.validator_perm_id.ok_or_else(|| {
            KeeperError::InvalidState("root permissions have no validation process".into())
        })?;
        let validator = self.load_permission(validator_id, "validator")?;
        self.require_valid(&validator, &perm.country, "validator")?;

        let (fees, deposit) = self.validation_escrow(&validator)?;
        self.escrow(&msg.creator, fees, deposit)?;

        perm.vp_state = VpState::Pending;
        perm.vp_last_state_change = self.now;
        perm.vp_current_fees = fees;
        perm.vp_current_deposit = deposit;
        perm.deposit = add_amount(perm.deposit, deposit, "permission deposit")?;
        perm.modified = self.now;
        let id = perm.id;
        self.save(perm);

        tracing::info!(permission = %id, fees, deposit, "renewal requested");
        self.emit(
            Event::new(EventKind::RenewPermissionVp)
                .attr("permission_id", id)
                .attr("creator", &msg.creator)
                .attr("fees", fees)
                .attr("deposit", deposit),
        );
        Ok(())
    }

    pub(crate) fn set_permission_vp_to_validated(
        &mut self,
        msg: &SetPermissionVpToValidated,
    ) -> Result<()> {
        let mut perm = self.load_permission(msg.id, "applicant")?;
        if perm.vp_state != VpState::Pending {
            return Err(KeeperError::InvalidState(format!(
                "permission {} must be PENDING to validate, is {}",
                perm.id, perm.vp_state
            )));
        }

        let renewal = perm.effective_from.is_some();
        if renewal {
            let unchanged = [
                ("validation_fees", perm.validation_fees == msg.validation_fees),
                ("issuance_fees", perm.issuance_fees == msg.issuance_fees),
                ("verification_fees", perm.verification_fees == msg.verification_fees),
                ("country", perm.country == msg.country),
                ("issuance_fee_discount", perm.issuance_fee_discount == msg.issuance_fee_discount),
                (
                    "verification_fee_discount",
                    perm.verification_fee_discount == msg.verification_fee_discount,
                ),
            ];
            if let Some((field, _)) = unchanged.iter().find(|(_, same)| !same) {
                return Err(KeeperError::InvalidArgument(format!(
                    "{} cannot be changed during renewal",
                    field
                )));
            }
        }

        let has_digest = msg
            .vp_summary_digest_sri
            .as_deref()
            .is_some_and(|d| !d.is_empty());
        if perm.perm_type == PermissionType::Holder && has_digest {
            return Err(KeeperError::InvalidArgument(
                "vp_summary_digest_sri must be null for HOLDER type".into(),
            ));
        }
        if !msg.country.is_empty() && !is_valid_country_code(&msg.country) {
            return Err(KeeperError::InvalidArgument(format!(
                "invalid country code: {}",
                msg.country
            )));
        }
        for (field, value) in [
            ("issuance_fee_discount", msg.issuance_fee_discount),
            ("verification_fee_discount", msg.verification_fee_discount),
        ] {
            if value > MAX_DISCOUNT_BPS {
                return Err(KeeperError::InvalidArgument(format!(
                    "{} cannot exceed {}",
                    field, MAX_DISCOUNT_BPS
                )));
            }
        }

        let validator_id = perm.validator_perm_id.ok_or_else(|| {
            KeeperError::InvalidState("root permissions have no validation process".into())
        })?;
        let validator = self.load_permission(validator_id, "validator")?;
        if validator.grantee != msg.creator {
            return Err(KeeperError::Unauthorized(
                "only the validator grantee can validate this permission".into(),
            ));
        }
        self.require_valid(&validator, &msg.country, "validator")?;

        if validator.perm_type != PermissionType::Ecosystem {
            if msg.issuance_fee_discount > validator.issuance_fee_discount {
                return Err(KeeperError::InvalidArgument(
                    "issuance_fee_discount cannot exceed validator's discount".into(),
                ));
            }
            if msg.verification_fee_discount > validator.verification_fee_discount {
                return Err(KeeperError::InvalidArgument(
                    "verification_fee_discount cannot exceed validator's discount".into(),
                ));
            }
        }

        let schema = self.load_schema(perm.schema_id)?;
        let vp_exp = next_vp_exp(perm.vp_exp, schema.validity_period_days(perm.perm_type), self.now)?;

        if let Some(until) = msg.effective_until {
            match perm.effective_until.filter(|_| renewal) {
                Some(previous) if until <= previous => {
                    return Err(KeeperError::InvalidArgument(
                        "effective_until must be greater than the current effective_until".into(),
                    ));
                }
                None if until <= self.now => {
                    return Err(KeeperError::InvalidArgument(
                        "effective_until must be in the future".into(),
                    ));
                }
                _ => {}
            }
            if let Some(exp) = vp_exp {
                if until > exp {
                    return Err(KeeperError::InvalidArgument(
                        "effective_until cannot be later than vp_exp".into(),
                    ));
                }
            }
        }

        // Release the escrowed validation fees to the validator.
        let fees = perm.vp_current_fees;
        let mut validator_deposit = 0;
        if fees > 0 {
            validator_deposit = Dec::from_int(fees)
                .checked_mul(self.deps.trust_deposit.trust_deposit_rate())?
                .truncate()?;
            self.deps.bank.send_coins_from_module_to_account(
                &self.config.escrow_module,
                &validator.grantee,
                fees,
            )?;
            if validator_deposit > 0 {
                self.deps
                    .trust_deposit
                    .adjust_trust_deposit(&validator.grantee, signed(validator_deposit)?)?;
                self.add_deposit(validator.id, validator_deposit)?;
            }
        }

        perm.validation_fees = msg.validation_fees;
        perm.issuance_fees = msg.issuance_fees;
        perm.verification_fees = msg.verification_fees;
        perm.issuance_fee_discount = msg.issuance_fee_discount;
        perm.verification_fee_discount = msg.verification_fee_discount;
        perm.country = msg.country.clone();
        perm.vp_summary_digest_sri = msg.vp_summary_digest_sri.clone().filter(|d| !d.is_empty());
        perm.vp_exp = vp_exp;
        perm.effective_until = msg.effective_until.or(vp_exp);
        perm.effective_from = perm.effective_from.or(Some(self.now));
        perm.vp_state = VpState::Validated;
        perm.vp_last_state_change = self.now;
        perm.vp_current_fees = 0;
        perm.vp_current_deposit = 0;
        perm.vp_validator_deposit =
            add_amount(perm.vp_validator_deposit, validator_deposit, "validator deposit")?;
        perm.modified = self.now;
        let id = perm.id;
        self.save(perm);

        tracing::info!(permission = %id, validator = %validator.id, renewal, "validation accepted");
        self.emit(
            Event::new(EventKind::SetPermissionVpToValidated)
                .attr("permission_id", id)
                .attr("validator_perm_id", validator.id)
                .attr("fees", fees)
                .attr("validator_deposit", validator_deposit),
        );
        Ok(())
    }

    pub(crate) fn cancel_permission_vp_last_request(
        &mut self,
        msg: &CancelPermissionVpLastRequest,
    ) -> Result<VpState> {
        let mut perm = self.load_permission(msg.id, "applicant")?;
        if perm.grantee != msg.creator {
            return Err(KeeperError::Unauthorized(
                "only the permission grantee can cancel".into(),
            ));
        }
        if perm.vp_state != VpState::Pending {
            return Err(KeeperError::InvalidState(format!(
                "permission {} must be PENDING to cancel, is {}",
                perm.id, perm.vp_state
            )));
        }

        let fees = perm.vp_current_fees;
        let deposit = perm.vp_current_deposit;
        if fees > 0 {
            self.deps.bank.send_coins_from_module_to_account(
                &self.config.escrow_module,
                &perm.grantee,
                fees,
            )?;
        }
        if deposit > 0 {
            self.deps
                .trust_deposit
                .adjust_trust_deposit(&perm.grantee, -signed(deposit)?)?;
        }

        let next_state = if perm.vp_exp.is_none() {
            VpState::Terminated
        } else {
            VpState::Validated
        };
        perm.vp_state = next_state;
        perm.vp_last_state_change = self.now;
        perm.vp_current_fees = 0;
        perm.vp_current_deposit = 0;
        perm.deposit = perm.deposit.saturating_sub(deposit);
        perm.modified = self.now;
        let id = perm.id;
        self.save(perm);

        tracing::info!(permission = %id, state = %next_state, refunded = fees, released = deposit, "validation request cancelled");
        self.emit(
            Event::new(EventKind::CancelPermissionVpLastRequest)
                .attr("permission_id", id)
                .attr("state", next_state)
                .attr("refunded_fees", fees)
                .attr("released_deposit", deposit),
        );
        Ok(next_state)
    }

    pub(crate) fn terminate_permission_vp(&mut self, msg: &TerminatePermissionVp) -> Result<()> {
        let mut perm = self.load_permission(msg.id, "applicant")?;
        if perm.vp_state != VpState::Validated {
            return Err(KeeperError::InvalidState(format!(
                "permission {} must be VALIDATED to terminate, is {}",
                perm.id, perm.vp_state
            )));
        }

        let validator = match perm.validator_perm_id {
            Some(id) => Some(self.load_permission(id, "validator")?),
            None => None,
        };
        let expired = perm.vp_exp.is_some_and(|exp| exp <= self.now);
        let by_validator = expired
            && validator
                .as_ref()
                .is_some_and(|v| v.grantee == msg.creator);
        if perm.grantee != msg.creator && !by_validator {
            return Err(KeeperError::Unauthorized(
                "only the grantee, or the validator once expired, can terminate".into(),
            ));
        }

        let released = perm.deposit;
        if released > 0 {
            self.deps
                .trust_deposit
                .adjust_trust_deposit(&perm.grantee, -signed(released)?)?;
        }

        let validator_released = perm.vp_validator_deposit;
        if let Some(mut validator) = validator.filter(|_| validator_released > 0) {
            self.deps
                .trust_deposit
                .adjust_trust_deposit(&validator.grantee, -signed(validator_released)?)?;
            validator.deposit = validator.deposit.saturating_sub(validator_released);
            self.save(validator);
        }

        perm.deposit = 0;
        perm.vp_validator_deposit = 0;
        perm.vp_state = VpState::Terminated;
        perm.vp_last_state_change = self.now;
        perm.terminated = Some(self.now);
        perm.terminated_by = Some(msg.creator.clone());
        perm.modified = self.now;
        let id = perm.id;
        self.save(perm);

        tracing::info!(permission = %id, released, validator_released, "validation process terminated");
        self.emit(
            Event::new(EventKind::TerminatePermissionVp)
                .attr("permission_id", id)
                .attr("terminated_by", &msg.creator)
                .attr("released_deposit", released),
        );
        Ok(())
    }
}

/// Next validation expiry: `None` when the period is zero, otherwise the
/// period added to the previous expiry (renewal) or to `now`.
fn next_vp_exp(previous: Option<i64>, days: u32, now: i64) -> Result<Option<i64>> {
    if days == 0 {
        return Ok(None);
    }
    let period = i64::from(days)
        .checked_mul(DAY_MILLIS)
        .ok_or_else(|| KeeperError::InvalidArgument("validity period overflow".into()))?;
    previous
        .unwrap_or(now)
        .checked_add(period)
        .map(Some)
        .ok_or_else(|| KeeperError::InvalidArgument("validity period overflow".into()))
}

impl<S: Store> Keeper<S> {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation Process
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply for a permission. Returns the new permission's id.
    pub fn start_permission_vp(&self, now: i64, msg: StartPermissionVp) -> Result<PermissionId> {
        self.transact(now, |tx| tx.start_permission_vp(&msg))
    }

    /// Re-open the validation process of a validated permission.
    ///
    /// Only VALIDATED permissions can renew. A PENDING request already holds
    /// escrowed fees, so renewing it fails with `InvalidState`; cancel it
    /// first. The permission stays valid on its current window while pending.
    pub fn renew_permission_vp(&self, now: i64, msg: RenewPermissionVp) -> Result<()> {
        self.transact(now, |tx| tx.renew_permission_vp(&msg))
    }

    /// Accept a pending request. Only the validator's grantee may call this.
    pub fn set_permission_vp_to_validated(
        &self,
        now: i64,
        msg: SetPermissionVpToValidated,
    ) -> Result<()> {
        self.transact(now, |tx| tx.set_permission_vp_to_validated(&msg))
    }

    /// Withdraw a pending request. Returns the state the permission fell back to.
    pub fn cancel_permission_vp_last_request(
        &self,
        now: i64,
        msg: CancelPermissionVpLastRequest,
    ) -> Result<VpState> {
        self.transact(now, |tx| tx.cancel_permission_vp_last_request(&msg))
    }

    /// End a validated permission and release its deposits.
    pub fn terminate_permission_vp(&self, now: i64, msg: TerminatePermissionVp) -> Result<()> {
        self.transact(now, |tx| tx.terminate_permission_vp(&msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{keeper_with, permission, seeded_store, test_schema};
    use trustperm_core::AccountId;

    fn tree() -> Vec<Permission> {
        let mut grantor = permission(2, PermissionType::IssuerGrantor, Some(1), "grantor");
        grantor.validation_fees = 10;
        grantor.issuance_fee_discount = 5_000;
        vec![permission(1, PermissionType::Ecosystem, None, "eco"), grantor]
    }

    fn start() -> StartPermissionVp {
        StartPermissionVp {
            creator: AccountId::from("applicant"),
            perm_type: PermissionType::Issuer,
            validator_perm_id: PermissionId(2),
            country: String::new(),
            did: Some("did:ex:applicant".into()),
            validation_fees: None,
            issuance_fees: Some(5),
            verification_fees: None,
        }
    }

    fn validate(id: PermissionId) -> SetPermissionVpToValidated {
        SetPermissionVpToValidated {
            creator: AccountId::from("grantor"),
            id,
            validation_fees: 0,
            issuance_fees: 5,
            verification_fees: 0,
            issuance_fee_discount: 0,
            verification_fee_discount: 0,
            country: String::new(),
            effective_until: None,
            vp_summary_digest_sri: Some("sha384-abc".into()),
        }
    }

    #[test]
    fn test_required_validator_types() {
        let mut schema = test_schema();
        assert_eq!(
            required_validator_type(PermissionType::Issuer, &schema).unwrap(),
            PermissionType::IssuerGrantor
        );
        assert_eq!(
            required_validator_type(PermissionType::IssuerGrantor, &schema).unwrap(),
            PermissionType::Ecosystem
        );
        assert_eq!(
            required_validator_type(PermissionType::Holder, &schema).unwrap(),
            PermissionType::Issuer
        );

        schema.verifier_perm_management_mode = PermManagementMode::Ecosystem;
        assert_eq!(
            required_validator_type(PermissionType::Verifier, &schema).unwrap(),
            PermissionType::Ecosystem
        );
        assert!(required_validator_type(PermissionType::VerifierGrantor, &schema).is_err());

        schema.issuer_perm_management_mode = PermManagementMode::Open;
        assert!(required_validator_type(PermissionType::Issuer, &schema).is_err());
        assert!(required_validator_type(PermissionType::Ecosystem, &schema).is_err());
    }

    #[test]
    fn test_next_vp_exp() {
        assert_eq!(next_vp_exp(None, 0, 1_000).unwrap(), None);
        assert_eq!(next_vp_exp(None, 1, 1_000).unwrap(), Some(1_000 + DAY_MILLIS));
        assert_eq!(
            next_vp_exp(Some(5_000), 2, 1_000).unwrap(),
            Some(5_000 + 2 * DAY_MILLIS)
        );
    }

    #[test]
    fn test_start_escrows_fees_and_deposit() {
        let keeper = keeper_with(seeded_store(tree()));

        let id = keeper.start_permission_vp(100, start()).unwrap();
        let perm = keeper.store().get_permission(id).unwrap().unwrap();
        assert_eq!(id, PermissionId(3));
        assert_eq!(perm.vp_state, VpState::Pending);
        assert_eq!(perm.validator_perm_id, Some(PermissionId(2)));
        assert_eq!(perm.vp_current_fees, 10);
        assert_eq!(perm.vp_current_deposit, 2);
        assert_eq!(perm.deposit, 2);
        assert_eq!(perm.issuance_fees, 5);
    }

    #[test]
    fn test_start_rejects_wrong_validator_type() {
        let keeper = keeper_with(seeded_store(tree()));

        let mut msg = start();
        msg.validator_perm_id = PermissionId(1);
        let err = keeper.start_permission_vp(100, msg).unwrap_err();
        assert!(err.to_string().contains("requires ISSUER_GRANTOR validator"));
        assert!(keeper.store().get_permission(PermissionId(3)).unwrap().is_none());
    }

    #[test]
    fn test_validate_pays_validator_and_sets_window() {
        let keeper = keeper_with(seeded_store(tree()));
        let id = keeper.start_permission_vp(100, start()).unwrap();

        let err = keeper
            .set_permission_vp_to_validated(
                200,
                SetPermissionVpToValidated {
                    creator: AccountId::from("applicant"),
                    ..validate(id)
                },
            )
            .unwrap_err();
        assert!(matches!(err, KeeperError::Unauthorized(_)));

        keeper.set_permission_vp_to_validated(200, validate(id)).unwrap();
        let perm = keeper.store().get_permission(id).unwrap().unwrap();
        let exp = 200 + 180 * DAY_MILLIS;
        assert_eq!(perm.vp_state, VpState::Validated);
        assert_eq!(perm.vp_exp, Some(exp));
        assert_eq!(perm.effective_from, Some(200));
        assert_eq!(perm.effective_until, Some(exp));
        assert_eq!(perm.vp_current_fees, 0);
        assert_eq!(perm.vp_current_deposit, 0);
        assert_eq!(perm.vp_validator_deposit, 2);

        let grantor = keeper.store().get_permission(PermissionId(2)).unwrap().unwrap();
        assert_eq!(grantor.deposit, 2);
    }

    #[test]
    fn test_discount_bounded_by_validator() {
        let keeper = keeper_with(seeded_store(tree()));
        let id = keeper.start_permission_vp(100, start()).unwrap();

        let mut msg = validate(id);
        msg.issuance_fee_discount = 6_000;
        let err = keeper.set_permission_vp_to_validated(200, msg).unwrap_err();
        assert!(err.to_string().contains("cannot exceed validator's discount"));

        let mut msg = validate(id);
        msg.issuance_fee_discount = 5_000;
        keeper.set_permission_vp_to_validated(200, msg).unwrap();
    }

    #[test]
    fn test_renewal_cannot_change_terms() {
        let keeper = keeper_with(seeded_store(tree()));
        let id = keeper.start_permission_vp(100, start()).unwrap();
        keeper.set_permission_vp_to_validated(200, validate(id)).unwrap();

        let renew = RenewPermissionVp {
            creator: AccountId::from("applicant"),
            id,
        };
        keeper.renew_permission_vp(300, renew.clone()).unwrap();
        let perm = keeper.store().get_permission(id).unwrap().unwrap();
        assert_eq!(perm.vp_state, VpState::Pending);
        assert_eq!(perm.deposit, 4);

        let err = keeper.renew_permission_vp(301, renew).unwrap_err();
        assert!(matches!(err, KeeperError::InvalidState(_)));

        let mut msg = validate(id);
        msg.issuance_fees = 6;
        let err = keeper.set_permission_vp_to_validated(400, msg).unwrap_err();
        assert!(err.to_string().contains("cannot be changed during renewal"));

        keeper.set_permission_vp_to_validated(400, validate(id)).unwrap();
        let perm = keeper.store().get_permission(id).unwrap().unwrap();
        assert_eq!(perm.vp_exp, Some(200 + 2 * 180 * DAY_MILLIS));
        assert_eq!(perm.effective_from, Some(200));
    }

    #[test]
    fn test_cancel_first_request_terminates() {
        let keeper = keeper_with(seeded_store(tree()));
        let id = keeper.start_permission_vp(100, start()).unwrap();
        let cancel = CancelPermissionVpLastRequest {
            creator: AccountId::from("applicant"),
            id,
        };

        let state = keeper.cancel_permission_vp_last_request(150, cancel.clone()).unwrap();
        assert_eq!(state, VpState::Terminated);
        let perm = keeper.store().get_permission(id).unwrap().unwrap();
        assert_eq!(perm.deposit, 0);
        assert_eq!(perm.vp_current_fees, 0);

        let err = keeper.cancel_permission_vp_last_request(160, cancel).unwrap_err();
        assert!(matches!(err, KeeperError::InvalidState(_)));
    }

    #[test]
    fn test_cancel_renewal_returns_to_validated() {
        let keeper = keeper_with(seeded_store(tree()));
        let id = keeper.start_permission_vp(100, start()).unwrap();
        keeper.set_permission_vp_to_validated(200, validate(id)).unwrap();
        keeper
            .renew_permission_vp(
                300,
                RenewPermissionVp {
                    creator: AccountId::from("applicant"),
                    id,
                },
            )
            .unwrap();

        let state = keeper
            .cancel_permission_vp_last_request(
                400,
                CancelPermissionVpLastRequest {
                    creator: AccountId::from("applicant"),
                    id,
                },
            )
            .unwrap();
        assert_eq!(state, VpState::Validated);
        let perm = keeper.store().get_permission(id).unwrap().unwrap();
        assert_eq!(perm.deposit, 2);
    }

    #[test]
    fn test_terminate_releases_deposits() {
        let keeper = keeper_with(seeded_store(tree()));
        let id = keeper.start_permission_vp(100, start()).unwrap();
        keeper.set_permission_vp_to_validated(200, validate(id)).unwrap();

        let terminate = |creator: &str| TerminatePermissionVp {
            creator: AccountId::from(creator),
            id,
        };
        let err = keeper.terminate_permission_vp(300, terminate("grantor")).unwrap_err();
        assert!(matches!(err, KeeperError::Unauthorized(_)));

        keeper.terminate_permission_vp(300, terminate("applicant")).unwrap();
        let perm = keeper.store().get_permission(id).unwrap().unwrap();
        assert_eq!(perm.vp_state, VpState::Terminated);
        assert_eq!(perm.terminated, Some(300));
        assert_eq!(perm.deposit, 0);
        assert_eq!(perm.vp_validator_deposit, 0);
        assert!(!perm.is_valid("", 300));

        let grantor = keeper.store().get_permission(PermissionId(2)).unwrap().unwrap();
        assert_eq!(grantor.deposit, 0);
    }
}
