//! Fee and trust-deposit distribution for sessions.
//!
//! Planning is pure: [`plan_distribution`] turns beneficiaries, a discount
//! and the current rates into exact integer amounts. [`Tx::apply_distribution`]
//! then moves coins and records deposits.
//!
//! For a beneficiary owed `fees` trust units:
//!
//! ```text
//! total      = fees * trust_unit_price * (1 - discount)
//! to_deposit = floor(total * trust_deposit_rate)
//! to_account = floor(total) - to_deposit
//! ```
//!
//! The executor locks the same `to_deposit` in its own trust deposit. Agent
//! rewards are summed over all beneficiaries before the same split is
//! applied once per agent.

use trustperm_core::{AccountId, Dec, Permission, PermissionId, MAX_DISCOUNT_BPS};
use trustperm_store::Store;

use crate::error::{KeeperError, Result};
use crate::keeper::{add_amount, signed, Tx};

/// Which fee a session pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFlavor {
    /// Issuer only: beneficiaries charge `issuance_fees`.
    Issuance,
    /// Verifier present: beneficiaries charge `verification_fees`.
    Verification,
}

impl SessionFlavor {
    pub fn fees_of(self, perm: &Permission) -> u64 {
        match self {
            SessionFlavor::Issuance => perm.issuance_fees,
            SessionFlavor::Verification => perm.verification_fees,
        }
    }

    /// Discount the executing permission enjoys on this flavor.
    pub fn discount_of(self, executor: &Permission) -> u64 {
        match self {
            SessionFlavor::Issuance => executor.issuance_fee_discount,
            SessionFlavor::Verification => executor.verification_fee_discount,
        }
    }
}

/// Rates read from collaborators at the start of a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeRates {
    pub trust_unit_price: u64,
    pub trust_deposit_rate: Dec,
    pub user_agent_reward_rate: Dec,
    pub wallet_user_agent_reward_rate: Dec,
}

/// An amount divided between a direct transfer and a trust deposit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Split {
    pub to_account: u64,
    pub to_deposit: u64,
}

impl Split {
    pub fn total(&self) -> u64 {
        self.to_account + self.to_deposit
    }

    pub fn is_zero(&self) -> bool {
        self.to_account == 0 && self.to_deposit == 0
    }
}

/// Split `total` with `trust_deposit_rate`, truncating each side.
pub fn split_amount(total: Dec, trust_deposit_rate: Dec) -> Result<Split> {
    let to_deposit = total.checked_mul(trust_deposit_rate)?.truncate()?;
    let to_account = total.truncate()?.checked_sub(to_deposit).ok_or_else(|| {
        KeeperError::InvalidArgument("trust deposit rate exceeds 100%".into())
    })?;
    Ok(Split {
        to_account,
        to_deposit,
    })
}

/// Payout owed to one beneficiary permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeneficiaryPayout {
    pub perm_id: PermissionId,
    pub grantee: AccountId,
    pub split: Split,
}

/// Every amount a session moves, computed before any mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionPlan {
    /// Undiscounted sum of beneficiary fees, in trust units.
    pub beneficiary_fees: u64,
    /// Balance the payer must hold.
    pub trust_fees: u64,
    /// Only beneficiaries with non-zero fees.
    pub payouts: Vec<BeneficiaryPayout>,
    /// Deposit the executor locks, equal to the sum of beneficiary deposits.
    pub executor_deposit: u64,
    pub user_agent: Split,
    pub wallet_agent: Split,
}

impl DistributionPlan {
    /// Everything debited from the payer.
    pub fn total_debit(&self) -> u64 {
        self.payouts.iter().map(|p| p.split.total()).sum::<u64>()
            + self.user_agent.total()
            + self.wallet_agent.total()
    }
}

/// Compute the distribution for `beneficiaries`.
///
/// `discount_bps` is the executor's discount on this flavor (0..=10000).
pub fn plan_distribution(
    beneficiaries: &[Permission],
    flavor: SessionFlavor,
    discount_bps: u64,
    rates: &FeeRates,
) -> Result<DistributionPlan> {
    if discount_bps > MAX_DISCOUNT_BPS {
        return Err(KeeperError::InvalidArgument(format!(
            "fee discount {} exceeds {}",
            discount_bps, MAX_DISCOUNT_BPS
        )));
    }

    let discount_factor = Dec::ONE.checked_sub(Dec::from_bps(discount_bps))?;
    let price = Dec::from_int(rates.trust_unit_price);

    let beneficiary_fees = beneficiaries.iter().try_fold(0u64, |acc, p| {
        acc.checked_add(flavor.fees_of(p))
            .ok_or_else(|| KeeperError::InvalidArgument("beneficiary fees overflow".into()))
    })?;

    let agent_rate = rates
        .user_agent_reward_rate
        .checked_add(rates.wallet_user_agent_reward_rate)?;
    let multiplier = Dec::ONE
        .checked_add(agent_rate)?
        .checked_mul(Dec::ONE.checked_add(rates.trust_deposit_rate)?)?;
    let trust_fees = Dec::from_int(beneficiary_fees)
        .checked_mul(discount_factor)?
        .checked_mul(multiplier)?
        .checked_mul(price)?
        .truncate()?;

    let mut plan = DistributionPlan {
        beneficiary_fees,
        trust_fees,
        ..DistributionPlan::default()
    };
    let mut user_agent_reward = Dec::ZERO;
    let mut wallet_agent_reward = Dec::ZERO;

    for perm in beneficiaries {
        let fees = flavor.fees_of(perm);
        if fees == 0 {
            continue;
        }

        let total = Dec::from_int(fees)
            .checked_mul(price)?
            .checked_mul(discount_factor)?;
        let split = split_amount(total, rates.trust_deposit_rate)?;

        user_agent_reward =
            user_agent_reward.checked_add(total.checked_mul(rates.user_agent_reward_rate)?)?;
        wallet_agent_reward = wallet_agent_reward
            .checked_add(total.checked_mul(rates.wallet_user_agent_reward_rate)?)?;

        plan.executor_deposit = add_amount(plan.executor_deposit, split.to_deposit, "executor deposit")?;
        plan.payouts.push(BeneficiaryPayout {
            perm_id: perm.id,
            grantee: perm.grantee.clone(),
            split,
        });
    }

    plan.user_agent = split_amount(user_agent_reward, rates.trust_deposit_rate)?;
    plan.wallet_agent = split_amount(wallet_agent_reward, rates.trust_deposit_rate)?;

    Ok(plan)
}

impl<S: Store> Tx<'_, S> {
    /// Current rates from the collaborators.
    pub(crate) fn fee_rates(&self) -> FeeRates {
        FeeRates {
            trust_unit_price: self.deps.registries.trust_unit_price(),
            trust_deposit_rate: self.deps.trust_deposit.trust_deposit_rate(),
            user_agent_reward_rate: self.deps.trust_deposit.user_agent_reward_rate(),
            wallet_user_agent_reward_rate: self.deps.trust_deposit.wallet_user_agent_reward_rate(),
        }
    }

    /// Execute `plan` on behalf of `payer`.
    ///
    /// Zero amounts move nothing. Agent payouts are skipped when the
    /// corresponding permission id is absent.
    pub(crate) fn apply_distribution(
        &mut self,
        plan: &DistributionPlan,
        payer: &AccountId,
        executor_perm_id: PermissionId,
        agent_perm_id: Option<PermissionId>,
        wallet_agent_perm_id: Option<PermissionId>,
    ) -> Result<()> {
        for payout in &plan.payouts {
            self.pay(payer, payout.perm_id, &payout.grantee, payout.split)?;

            if payout.split.to_deposit > 0 {
                self.deps
                    .trust_deposit
                    .adjust_trust_deposit(payer, signed(payout.split.to_deposit)?)?;
                self.add_deposit(executor_perm_id, payout.split.to_deposit)?;
            }
        }

        for (agent_id, split) in [
            (agent_perm_id, plan.user_agent),
            (wallet_agent_perm_id, plan.wallet_agent),
        ] {
            let Some(agent_id) = agent_id else { continue };
            if split.is_zero() {
                continue;
            }
            let agent = self.load_permission(agent_id, "agent")?;
            self.pay(payer, agent_id, &agent.grantee, split)?;
        }

        Ok(())
    }

    /// Transfer the direct share and lock the deposit share for `grantee`.
    fn pay(
        &mut self,
        payer: &AccountId,
        perm_id: PermissionId,
        grantee: &AccountId,
        split: Split,
    ) -> Result<()> {
        if split.to_account > 0 {
            self.deps.bank.send_coins(payer, grantee, split.to_account)?;
        }

        if split.to_deposit > 0 {
            self.deps.bank.send_coins_from_account_to_module(
                payer,
                &self.config.trust_deposit_module,
                split.to_deposit,
            )?;
            self.deps
                .trust_deposit
                .adjust_trust_deposit(grantee, signed(split.to_deposit)?)?;
            self.add_deposit(perm_id, split.to_deposit)?;
        }

        Ok(())
    }

    /// Record `amount` more trust deposit against a permission.
    pub(crate) fn add_deposit(&mut self, perm_id: PermissionId, amount: u64) -> Result<()> {
        let mut perm = self.load_permission(perm_id, "deposit holder")?;
        perm.deposit = add_amount(perm.deposit, amount, "permission deposit")?;
        self.save(perm);
        Ok(())
    }
}
