//! Golden fee-distribution vectors.
//!
//! Each vector fixes the inputs of [`plan_distribution`] and the exact
//! integer amounts it must produce. Any implementation of the fee rules has
//! to reproduce them to the unit, truncation included.

use serde::{Deserialize, Serialize};

use trustperm::{plan_distribution, DistributionPlan, FeeRates, SessionFlavor, Split};
use trustperm_core::{AccountId, Dec, Permission, PermissionId, PermissionType, VpState};

const FEE_VECTORS_JSON: &str = include_str!("../data/fee_vectors.json");

/// Fee each beneficiary charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorFlavor {
    Issuance,
    Verification,
}

impl From<VectorFlavor> for SessionFlavor {
    fn from(flavor: VectorFlavor) -> Self {
        match flavor {
            VectorFlavor::Issuance => SessionFlavor::Issuance,
            VectorFlavor::Verification => SessionFlavor::Verification,
        }
    }
}

/// Expected direct and deposit amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitVector {
    pub to_account: u64,
    pub to_deposit: u64,
}

impl From<Split> for SplitVector {
    fn from(split: Split) -> Self {
        Self {
            to_account: split.to_account,
            to_deposit: split.to_deposit,
        }
    }
}

/// Expected distribution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedPlan {
    pub trust_fees: u64,
    pub payouts: Vec<SplitVector>,
    pub executor_deposit: u64,
    pub user_agent: SplitVector,
    pub wallet_agent: SplitVector,
}

impl From<&DistributionPlan> for ExpectedPlan {
    fn from(plan: &DistributionPlan) -> Self {
        Self {
            trust_fees: plan.trust_fees,
            payouts: plan.payouts.iter().map(|p| p.split.into()).collect(),
            executor_deposit: plan.executor_deposit,
            user_agent: plan.user_agent.into(),
            wallet_agent: plan.wallet_agent.into(),
        }
    }
}

/// A golden fee vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeVector {
    pub name: String,
    pub description: String,
    pub flavor: VectorFlavor,
    /// Fees of each beneficiary, ecosystem first.
    pub beneficiary_fees: Vec<u64>,
    pub discount_bps: u64,
    pub trust_unit_price: u64,
    pub trust_deposit_rate: Dec,
    pub user_agent_reward_rate: Dec,
    pub wallet_user_agent_reward_rate: Dec,
    pub expected: ExpectedPlan,
}

impl FeeVector {
    pub fn rates(&self) -> FeeRates {
        FeeRates {
            trust_unit_price: self.trust_unit_price,
            trust_deposit_rate: self.trust_deposit_rate,
            user_agent_reward_rate: self.user_agent_reward_rate,
            wallet_user_agent_reward_rate: self.wallet_user_agent_reward_rate,
        }
    }

    /// One validated permission per entry of `beneficiary_fees`, each
    /// charging its fee on the vector's flavor.
    pub fn beneficiaries(&self) -> Vec<Permission> {
        self.beneficiary_fees
            .iter()
            .enumerate()
            .map(|(i, &fees)| {
                let id = i as u64 + 1;
                let perm_type = if i == 0 {
                    PermissionType::Ecosystem
                } else {
                    PermissionType::IssuerGrantor
                };
                let mut perm = Permission::new(
                    PermissionId(id),
                    perm_type,
                    1,
                    AccountId::new(format!("beneficiary-{}", id)),
                    0,
                );
                perm.validator_perm_id = (i > 0).then(|| PermissionId(id - 1));
                perm.vp_state = VpState::Validated;
                match self.flavor {
                    VectorFlavor::Issuance => perm.issuance_fees = fees,
                    VectorFlavor::Verification => perm.verification_fees = fees,
                }
                perm
            })
            .collect()
    }

    /// Plan the vector's distribution.
    pub fn plan(&self) -> trustperm::Result<DistributionPlan> {
        plan_distribution(
            &self.beneficiaries(),
            self.flavor.into(),
            self.discount_bps,
            &self.rates(),
        )
    }
}

/// Every golden vector shipped with the testkit.
pub fn all_vectors() -> Result<Vec<FeeVector>, serde_json::Error> {
    serde_json::from_str(FEE_VECTORS_JSON)
}

/// Check every vector, returning `(name, matches, actual)` per vector.
pub fn verify_all_vectors() -> Result<Vec<(String, bool, String)>, serde_json::Error> {
    Ok(all_vectors()?
        .iter()
        .map(|v| match v.plan() {
            Ok(plan) => {
                let actual = ExpectedPlan::from(&plan);
                let summary = serde_json::to_string(&actual).unwrap_or_default();
                (v.name.clone(), actual == v.expected, summary)
            }
            Err(e) => (v.name.clone(), false, e.to_string()),
        })
        .collect())
}
