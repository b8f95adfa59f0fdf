//! Queries over a permission tree built through the handlers.

use trustperm::{
    AccountId, ErrorKind, FindPermissionsWithDid, PermManagementMode, PermissionId, PermissionType,
    OPEN_MODE_IMPLICIT_PERMISSION,
};
use trustperm_testkit::{PermissionTree, Terms, TestFixture, TREE_SCHEMA_ID};

const NOW: i64 = 1_000;

fn setup() -> (TestFixture, PermissionTree) {
    let fx = TestFixture::new();
    let tree = fx.build_tree(NOW).unwrap();
    (fx, tree)
}

#[test]
fn test_find_beneficiaries_preview_matches_session() -> anyhow::Result<()> {
    let (fx, tree) = setup();

    let preview = fx
        .keeper
        .find_beneficiaries(NOW + 1, Some(tree.issuer), Some(tree.verifier))?;
    let ids: Vec<PermissionId> = preview.iter().map(|p| p.id).collect();
    assert_eq!(
        ids,
        vec![tree.issuer_grantor, tree.ecosystem, tree.issuer, tree.verifier_grantor]
    );

    fx.fund("verifier", 1_000);
    let plan = fx
        .keeper
        .create_or_update_permission_session(NOW + 1, tree.verification("s-1"))?;
    for payout in &plan.payouts {
        assert!(ids.contains(&payout.perm_id));
    }
    Ok(())
}

#[test]
fn test_list_permissions_pages_by_modified() -> anyhow::Result<()> {
    let (fx, tree) = setup();
    fx.keeper.revoke_permission(
        NOW + 50,
        trustperm::RevokePermission {
            creator: AccountId::from("issuer"),
            id: tree.issuer,
        },
    )?;

    let modified = fx.keeper.list_permissions(Some(NOW), None)?;
    let ids: Vec<PermissionId> = modified.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![tree.issuer]);

    assert_eq!(fx.keeper.list_permissions(None, Some(3))?.len(), 3);
    let err = fx.keeper.list_permissions(None, Some(0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    Ok(())
}

#[test]
fn test_list_sessions() -> anyhow::Result<()> {
    let (fx, tree) = setup();
    fx.fund("issuer", 10_000);
    fx.keeper
        .create_or_update_permission_session(NOW + 10, tree.issuance("a"))?;
    fx.keeper
        .create_or_update_permission_session(NOW + 20, tree.issuance("b"))?;

    let all = fx.keeper.list_permission_sessions(None, None)?;
    let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);

    let recent = fx.keeper.list_permission_sessions(Some(NOW + 10), None)?;
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, "b");
    Ok(())
}

#[test]
fn test_find_permissions_with_did() -> anyhow::Result<()> {
    let (fx, tree) = setup();
    let query = FindPermissionsWithDid {
        did: "did:example:issuer".into(),
        perm_type: PermissionType::Issuer,
        schema_id: TREE_SCHEMA_ID,
        country: String::new(),
        when: Some(NOW + 1),
    };

    let found = fx.keeper.find_permissions_with_did(&query)?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, tree.issuer);

    // Before validation took effect nothing matches.
    let early = FindPermissionsWithDid {
        when: Some(NOW - 1),
        ..query.clone()
    };
    assert!(fx.keeper.find_permissions_with_did(&early)?.is_empty());

    let wrong_type = FindPermissionsWithDid {
        perm_type: PermissionType::Verifier,
        ..query
    };
    assert!(fx.keeper.find_permissions_with_did(&wrong_type)?.is_empty());
    Ok(())
}

#[test]
fn test_open_schema_falls_back_to_ecosystem() -> anyhow::Result<()> {
    let fx = TestFixture::new();
    fx.add_schema(1, 30, "tr", PermManagementMode::Open, PermManagementMode::Open);
    let root = fx.create_root(NOW, 30, "tr", &Terms::issuance(5))?;

    let query = FindPermissionsWithDid {
        did: "did:example:stranger".into(),
        perm_type: PermissionType::Issuer,
        schema_id: 30,
        country: "US".into(),
        when: None,
    };
    let found = fx.keeper.find_permissions_with_did(&query)?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, root);
    assert_eq!(
        found[0].vp_summary_digest_sri.as_deref(),
        Some(OPEN_MODE_IMPLICIT_PERMISSION)
    );
    // The stored root is untouched.
    assert_eq!(fx.permission(root)?.vp_summary_digest_sri, None);

    let bad_country = FindPermissionsWithDid {
        country: "usa".into(),
        ..query
    };
    let err = fx.keeper.find_permissions_with_did(&bad_country).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    Ok(())
}

#[test]
fn test_query_json_shape() -> anyhow::Result<()> {
    let query: FindPermissionsWithDid = serde_json::from_str(
        r#"{ "did": "did:example:x", "perm_type": "ISSUER", "schema_id": 3 }"#,
    )?;
    assert_eq!(query.country, "");
    assert_eq!(query.when, None);
    Ok(())
}
