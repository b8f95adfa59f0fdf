//! Golden fee vectors, checked against the planner and against live
//! issuance sessions.
//!
//! Every implementation of the fee rules must produce identical:
//! - trust_fees
//! - per-beneficiary direct and deposit shares
//! - executor deposit
//! - user agent and wallet agent shares

use trustperm::{AccountId, CreateOrUpdatePermissionSession, PermManagementMode, PermissionType};
use trustperm_testkit::vectors::{all_vectors, ExpectedPlan, FeeVector, SplitVector, VectorFlavor};
use trustperm_testkit::{Rates, Terms, TestFixture};

const NOW: i64 = 1_000;

#[test]
fn test_planner_matches_vectors() -> anyhow::Result<()> {
    for vector in all_vectors()? {
        let plan = vector.plan()?;
        assert_eq!(
            ExpectedPlan::from(&plan),
            vector.expected,
            "vector '{}': {}",
            vector.name,
            vector.description
        );
    }
    Ok(())
}

#[test]
fn test_vectors_reserialize_identically() -> anyhow::Result<()> {
    let vectors = all_vectors()?;
    let json = serde_json::to_string_pretty(&vectors)?;
    let reparsed: Vec<FeeVector> = serde_json::from_str(&json)?;
    assert_eq!(reparsed, vectors);
    Ok(())
}

/// Run an issuance vector through real handlers.
///
/// One fee: the issuer is validated by the ecosystem. Two fees: by an
/// issuer grantor charging the second fee.
fn live_plan(vector: &FeeVector) -> anyhow::Result<ExpectedPlan> {
    let fx = TestFixture::new();
    fx.registries.set_trust_unit_price(vector.trust_unit_price);
    fx.trust_deposit.set_rates(Rates {
        trust_deposit: vector.trust_deposit_rate,
        user_agent_reward: vector.user_agent_reward_rate,
        wallet_user_agent_reward: vector.wallet_user_agent_reward_rate,
    });

    let issuer_mode = if vector.beneficiary_fees.len() == 1 {
        PermManagementMode::Ecosystem
    } else {
        PermManagementMode::GrantorValidation
    };
    fx.add_schema(1, 1, "tr", issuer_mode, PermManagementMode::Open);
    let root = fx.create_root(NOW, 1, "tr", &Terms::issuance(vector.beneficiary_fees[0]))?;

    let validator = match vector.beneficiary_fees.get(1) {
        Some(&fees) => fx.grant(
            NOW,
            PermissionType::IssuerGrantor,
            root,
            "grantor",
            &Terms {
                issuance_fees: fees,
                issuance_fee_discount: 10_000,
                ..Terms::default()
            },
        )?,
        None => root,
    };
    let discounted = Terms {
        issuance_fee_discount: vector.discount_bps,
        ..Terms::default()
    };
    let issuer = fx.grant(NOW, PermissionType::Issuer, validator, "issuer", &discounted)?;
    let agent = fx.grant(NOW, PermissionType::Issuer, validator, "agent", &Terms::default())?;
    let wallet = fx.grant(NOW, PermissionType::Issuer, validator, "wallet", &Terms::default())?;

    fx.fund("payer", vector.expected.trust_fees);
    let plan = fx.keeper.create_or_update_permission_session(
        NOW + 1,
        CreateOrUpdatePermissionSession {
            creator: AccountId::from("payer"),
            id: trustperm_testkit::session_id(),
            issuer_perm_id: Some(issuer),
            verifier_perm_id: None,
            agent_perm_id: agent,
            wallet_agent_perm_id: Some(wallet),
        },
    )?;

    let mut live = ExpectedPlan::from(&plan);
    // Sessions walk nearest ancestor first; vectors list the ecosystem first.
    live.payouts.reverse();
    Ok(live)
}

#[test]
fn test_issuance_vectors_through_sessions() -> anyhow::Result<()> {
    let vectors: Vec<FeeVector> = all_vectors()?
        .into_iter()
        .filter(|v| v.flavor == VectorFlavor::Issuance && v.beneficiary_fees.len() <= 2)
        .collect();
    assert!(vectors.len() >= 3);

    for vector in vectors {
        let live = live_plan(&vector)?;
        assert_eq!(live, vector.expected, "vector '{}'", vector.name);
    }
    Ok(())
}

#[test]
fn test_zero_split_is_default() {
    assert_eq!(
        SplitVector::from(trustperm::Split::default()),
        SplitVector {
            to_account: 0,
            to_deposit: 0
        }
    );
}
