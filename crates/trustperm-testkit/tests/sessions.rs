//! Sessions paying a full permission tree through tracking collaborators.

use trustperm::{
    AccountId, CreatePermission, CreateOrUpdatePermissionSession, ErrorKind, EventKind,
    PermManagementMode, PermissionId, PermissionType, RepayPermissionSlashedTrustDeposit,
    RevokePermission, SlashPermissionTrustDeposit,
};
use trustperm_testkit::{Movement, PermissionTree, Terms, TestFixture, TREE_CONTROLLER};

const NOW: i64 = 1_000;

fn setup() -> anyhow::Result<(TestFixture, PermissionTree)> {
    let fx = TestFixture::new();
    let tree = fx.build_tree(NOW)?;
    fx.ledger.clear_movements();
    fx.events.clear();
    Ok((fx, tree))
}

fn deposit(fx: &TestFixture, id: PermissionId) -> u64 {
    fx.permission(id).unwrap().deposit
}

#[test]
fn test_tree_deposits_after_validation() -> anyhow::Result<()> {
    let (fx, tree) = setup()?;

    // Two grantors paid the ecosystem 10 each.
    assert_eq!(fx.balance("tr-controller"), 20);
    assert_eq!(deposit(&fx, tree.ecosystem), 4);
    // Own escrow deposit plus 4 for each of the three permissions it validated.
    assert_eq!(deposit(&fx, tree.issuer_grantor), 14);
    // Applicants are funded for fees and deposit; only the fees leave.
    assert_eq!(fx.balance("issuer-grantor"), 2 + 60);
    assert_eq!(fx.balance("issuer"), 4);
    assert_eq!(deposit(&fx, tree.issuer), 4);
    assert_eq!(deposit(&fx, tree.verifier), 0);
    assert_eq!(fx.ledger.module_balance("perm"), 0);
    Ok(())
}

#[test]
fn test_issuance_session_pays_issuer_chain() -> anyhow::Result<()> {
    let (fx, tree) = setup()?;
    fx.fund("issuer", 207);

    let plan = fx
        .keeper
        .create_or_update_permission_session(2_000, tree.issuance("s-1"))?;
    assert_eq!(plan.trust_fees, 207);
    assert_eq!(plan.total_debit(), 172);

    assert_eq!(fx.balance("issuer"), 4 + 207 - 172);
    assert_eq!(fx.balance("issuer-grantor"), 62 + 40);
    assert_eq!(fx.balance("tr-controller"), 20 + 80);
    assert_eq!(fx.balance("agent"), 4 + 12);
    assert_eq!(fx.balance("wallet-agent"), 4 + 6);
    assert_eq!(fx.ledger.module_balance("td"), 10 + 20 + 3 + 1);

    assert_eq!(deposit(&fx, tree.issuer_grantor), 14 + 10);
    assert_eq!(deposit(&fx, tree.ecosystem), 4 + 20);
    assert_eq!(deposit(&fx, tree.issuer), 4 + 30);
    assert_eq!(deposit(&fx, tree.agent), 4 + 3);
    assert_eq!(deposit(&fx, tree.wallet_agent), 4 + 1);

    // The executor's deposit is locked on the payer without a transfer.
    let payer = AccountId::from("issuer");
    assert!(fx.ledger.movements().contains(&Movement::Adjust {
        account: payer,
        delta: 10,
    }));

    let session = fx.keeper.get_permission_session("s-1")?;
    assert_eq!(session.controller, AccountId::from("issuer"));
    assert_eq!(session.agent_perm_id, tree.agent);
    assert_eq!(session.authz.len(), 1);
    assert_eq!(session.authz[0].executor_perm_id, Some(tree.issuer));

    assert_eq!(fx.events.kinds(), vec![EventKind::CreateOrUpdatePermissionSession]);
    assert_eq!(fx.events.events()[0].get("trust_fees"), Some("207"));
    Ok(())
}

#[test]
fn test_verification_session_pays_both_chains() -> anyhow::Result<()> {
    let (fx, tree) = setup()?;
    fx.fund("verifier", 124);

    let plan = fx
        .keeper
        .create_or_update_permission_session(2_000, tree.verification("s-2"))?;
    assert_eq!(plan.trust_fees, 124);
    assert_eq!(plan.total_debit(), 103);

    // Only the ecosystem and the verifier grantor charge verification fees.
    let paid: Vec<PermissionId> = plan.payouts.iter().map(|p| p.perm_id).collect();
    assert_eq!(paid, vec![tree.ecosystem, tree.verifier_grantor]);

    assert_eq!(fx.balance("verifier"), 124 - 103);
    assert_eq!(fx.balance("tr-controller"), 20 + 48);
    assert_eq!(fx.balance("verifier-grantor"), 2 + 24);
    assert_eq!(fx.balance("agent"), 4 + 8);
    assert_eq!(fx.balance("wallet-agent"), 4 + 4);

    assert_eq!(deposit(&fx, tree.verifier), 18);
    assert_eq!(deposit(&fx, tree.agent), 4 + 1);
    assert_eq!(deposit(&fx, tree.wallet_agent), 4);
    Ok(())
}

#[test]
fn test_session_requires_trust_fees_up_front() -> anyhow::Result<()> {
    let (fx, tree) = setup()?;
    // Tops the balance up to one short of the trust fees.
    fx.fund("issuer", 202);

    let err = fx
        .keeper
        .create_or_update_permission_session(2_000, tree.issuance("s-1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(fx.balance("issuer"), 206);
    assert!(fx.ledger.movements().is_empty());
    assert!(fx.events.events().is_empty());
    Ok(())
}

#[test]
fn test_session_accumulates_authorizations() -> anyhow::Result<()> {
    let (fx, tree) = setup()?;
    fx.fund("issuer", 1_000);

    fx.keeper
        .create_or_update_permission_session(2_000, tree.issuance("s-1"))?;

    let mut second = tree.issuance("s-1");
    second.wallet_agent_perm_id = None;
    let plan = fx.keeper.create_or_update_permission_session(3_000, second)?;
    assert!(plan.wallet_agent.to_account > 0, "planned even without a wallet agent");
    // Nothing is paid to a wallet agent that is not named.
    assert_eq!(fx.balance("wallet-agent"), 4 + 6);

    let session = fx.keeper.get_permission_session("s-1")?;
    assert_eq!(session.authz.len(), 2);
    assert_eq!(session.created, 2_000);
    assert_eq!(session.modified, 3_000);

    let err = fx
        .keeper
        .create_or_update_permission_session(4_000, tree.issuance("s-1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    Ok(())
}

#[test]
fn test_revoked_grantor_is_skipped() -> anyhow::Result<()> {
    let (fx, tree) = setup()?;
    fx.keeper.revoke_permission(
        1_500,
        trustperm::RevokePermission {
            creator: AccountId::from("tr-controller"),
            id: tree.issuer_grantor,
        },
    )?;
    fx.fund("issuer", 1_000);

    let plan = fx
        .keeper
        .create_or_update_permission_session(2_000, tree.issuance("s-1"))?;
    let paid: Vec<PermissionId> = plan.payouts.iter().map(|p| p.perm_id).collect();
    assert_eq!(paid, vec![tree.ecosystem]);
    assert_eq!(plan.trust_fees, 138);
    Ok(())
}

#[test]
fn test_invalid_participant_rejected() -> anyhow::Result<()> {
    let (fx, tree) = setup()?;
    fx.fund("issuer", 1_000);

    let mut msg = tree.issuance("s-1");
    msg.agent_perm_id = tree.verifier;
    let err = fx.keeper.create_or_update_permission_session(2_000, msg).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    fx.keeper.revoke_permission(
        1_500,
        trustperm::RevokePermission {
            creator: AccountId::from("issuer"),
            id: tree.issuer,
        },
    )?;
    let err = fx
        .keeper
        .create_or_update_permission_session(2_000, tree.issuance("s-1"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(fx.keeper.get_permission_session("s-1").is_err());
    Ok(())
}

#[test]
fn test_repaid_issuer_is_paid_on_verification() -> anyhow::Result<()> {
    let (fx, tree) = setup()?;
    let issuer = fx.grant(
        NOW,
        PermissionType::Issuer,
        tree.issuer_grantor,
        "paid-issuer",
        &Terms::verification(40),
    )?;

    fx.keeper.slash_permission_trust_deposit(
        1_100,
        SlashPermissionTrustDeposit {
            creator: AccountId::from(TREE_CONTROLLER),
            id: issuer,
            amount: 1,
        },
    )?;
    fx.fund("sponsor", 1);
    fx.keeper.repay_permission_slashed_trust_deposit(
        1_200,
        RepayPermissionSlashedTrustDeposit {
            creator: AccountId::from("sponsor"),
            id: issuer,
        },
    )?;
    assert!(fx.permission(issuer)?.is_valid("", 2_000));

    fx.fund("verifier", 1_000);
    let mut msg = tree.verification("s-1");
    msg.issuer_perm_id = Some(issuer);
    let plan = fx.keeper.create_or_update_permission_session(2_000, msg)?;

    let paid: Vec<PermissionId> = plan.payouts.iter().map(|p| p.perm_id).collect();
    assert_eq!(paid, vec![tree.ecosystem, issuer, tree.verifier_grantor]);
    let issuer_payout = plan
        .payouts
        .iter()
        .find(|p| p.perm_id == issuer)
        .map(|p| p.split)
        .unwrap_or_default();
    assert_eq!(issuer_payout.to_account, 32);
    assert_eq!(issuer_payout.to_deposit, 8);
    assert_eq!(fx.balance("paid-issuer"), 4 + 32);
    Ok(())
}

#[test]
fn test_open_schema_without_ecosystem_records_session() -> anyhow::Result<()> {
    let fx = TestFixture::new();
    fx.add_schema(1, 5, "tr", PermManagementMode::Open, PermManagementMode::Open);
    let root = fx.create_root(NOW, 5, "tr", &Terms::issuance(100))?;

    let open_issuer = |grantee: &str| -> trustperm::Result<PermissionId> {
        fx.keeper.create_permission(
            NOW,
            CreatePermission {
                creator: AccountId::from(grantee),
                schema_id: 5,
                perm_type: PermissionType::Issuer,
                did: Some(format!("did:example:{}", grantee)),
                country: String::new(),
                effective_from: None,
                effective_until: None,
                verification_fees: 0,
            },
        )
    };
    let issuer = open_issuer("issuer")?;
    let agent = open_issuer("agent")?;

    fx.keeper.revoke_permission(
        1_500,
        RevokePermission {
            creator: AccountId::from("tr"),
            id: root,
        },
    )?;
    fx.ledger.clear_movements();

    let plan = fx.keeper.create_or_update_permission_session(
        2_000,
        CreateOrUpdatePermissionSession {
            creator: AccountId::from("issuer"),
            id: "s-open".into(),
            issuer_perm_id: Some(issuer),
            verifier_perm_id: None,
            agent_perm_id: agent,
            wallet_agent_perm_id: None,
        },
    )?;
    assert_eq!(plan.trust_fees, 0);
    assert!(plan.payouts.is_empty());
    assert!(fx.ledger.movements().is_empty());
    assert_eq!(fx.keeper.get_permission_session("s-open")?.authz.len(), 1);
    Ok(())
}
