//! Proptest generators for property-based testing.

use proptest::prelude::*;

use trustperm::{FeeRates, SessionFlavor};
use trustperm_core::{
    AccountId, Dec, Permission, PermissionId, PermissionType, VpState, MAX_DISCOUNT_BPS,
};

/// A rate between zero and `max_bps` basis points.
pub fn rate(max_bps: u64) -> impl Strategy<Value = Dec> {
    (0u64..=max_bps).prop_map(Dec::from_bps)
}

/// A discount in basis points.
pub fn discount() -> impl Strategy<Value = u64> {
    0u64..=MAX_DISCOUNT_BPS
}

/// A fee in trust units, zero about a fifth of the time.
pub fn fee() -> impl Strategy<Value = u64> {
    prop_oneof![
        1 => Just(0u64),
        4 => 1u64..=1_000_000u64,
    ]
}

pub fn account() -> impl Strategy<Value = AccountId> {
    "[a-z][a-z0-9]{2,15}".prop_map(AccountId::new)
}

/// Empty (unrestricted) or a two-letter country code.
pub fn country() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[A-Z]{2}".prop_map(String::from)]
}

pub fn permission_type() -> impl Strategy<Value = PermissionType> {
    prop_oneof![
        Just(PermissionType::Ecosystem),
        Just(PermissionType::IssuerGrantor),
        Just(PermissionType::VerifierGrantor),
        Just(PermissionType::Issuer),
        Just(PermissionType::Verifier),
        Just(PermissionType::Holder),
    ]
}

/// Inputs of one fee distribution.
#[derive(Debug, Clone)]
pub struct FeeScenario {
    pub flavor: SessionFlavor,
    /// Fees of each beneficiary, ecosystem first.
    pub fees: Vec<u64>,
    pub discount_bps: u64,
    pub trust_unit_price: u64,
    pub trust_deposit_rate: Dec,
    pub user_agent_reward_rate: Dec,
    pub wallet_user_agent_reward_rate: Dec,
}

impl Arbitrary for FeeScenario {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<bool>(),
            prop::collection::vec(fee(), 1..=6),
            discount(),
            1u64..=100u64, // trust unit price
            rate(10_000),
            rate(5_000),
            rate(5_000),
        )
            .prop_map(|(verification, fees, discount_bps, price, td, ua, wua)| FeeScenario {
                flavor: if verification {
                    SessionFlavor::Verification
                } else {
                    SessionFlavor::Issuance
                },
                fees,
                discount_bps,
                trust_unit_price: price,
                trust_deposit_rate: td,
                user_agent_reward_rate: ua,
                wallet_user_agent_reward_rate: wua,
            })
            .boxed()
    }
}

impl FeeScenario {
    pub fn rates(&self) -> FeeRates {
        FeeRates {
            trust_unit_price: self.trust_unit_price,
            trust_deposit_rate: self.trust_deposit_rate,
            user_agent_reward_rate: self.user_agent_reward_rate,
            wallet_user_agent_reward_rate: self.wallet_user_agent_reward_rate,
        }
    }

    /// A validator chain with one permission per fee.
    pub fn beneficiaries(&self) -> Vec<Permission> {
        self.fees
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
                    AccountId::new(format!("grantee-{}", id)),
                    0,
                );
                perm.validator_perm_id = (i > 0).then(|| PermissionId(id - 1));
                perm.vp_state = VpState::Validated;
                perm.issuance_fees = fees;
                perm.verification_fees = fees;
                perm
            })
            .collect()
    }
}
