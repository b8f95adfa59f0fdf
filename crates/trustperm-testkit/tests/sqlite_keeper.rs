//! The keeper over a SQLite store: state survives a reopen.

use tempfile::TempDir;
use trustperm::store::SqliteStore;
use trustperm::{PermManagementMode, PermissionType, VpState};
use trustperm_testkit::{PermissionTree, Terms, TestFixture, TREE_CONTROLLER, TREE_SCHEMA_ID};

const NOW: i64 = 1_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn test_tree_and_session_persist() -> anyhow::Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let path = dir.path().join("perms.db");

    let tree: PermissionTree = {
        let fx = TestFixture::with_store(SqliteStore::open(&path)?);
        let tree = fx.build_tree(NOW)?;
        fx.fund("issuer", 1_000);
        fx.keeper
            .create_or_update_permission_session(NOW + 1, tree.issuance("persisted"))?;
        tree
    };

    let fx = TestFixture::with_store(SqliteStore::open(&path)?);
    fx.add_schema(
        1,
        TREE_SCHEMA_ID,
        TREE_CONTROLLER,
        PermManagementMode::GrantorValidation,
        PermManagementMode::GrantorValidation,
    );
    let issuer = fx.permission(tree.issuer)?;
    assert_eq!(issuer.perm_type, PermissionType::Issuer);
    assert_eq!(issuer.vp_state, VpState::Validated);
    assert_eq!(issuer.deposit, 4 + 30);

    let session = fx.keeper.get_permission_session("persisted")?;
    assert_eq!(session.authz.len(), 1);

    // Ids keep counting from where the first keeper stopped.
    let late = fx.grant(
        NOW + 10,
        PermissionType::Issuer,
        tree.issuer_grantor,
        "late",
        &Terms::default(),
    )?;
    assert_eq!(late.get(), 8);
    assert_eq!(fx.keeper.list_permissions(None, None)?.len(), 8);
    Ok(())
}

#[test]
fn test_failed_handler_commits_nothing() -> anyhow::Result<()> {
    init_tracing();
    let fx = TestFixture::with_store(SqliteStore::open_memory()?);
    let tree = fx.build_tree(NOW)?;
    let before = fx.keeper.list_permissions(None, None)?;

    fx.fund("issuer", 1_000);
    fx.ledger.fail_after(3);
    let err = fx
        .keeper
        .create_or_update_permission_session(NOW + 1, tree.issuance("s-1"))
        .unwrap_err();
    assert_eq!(err.kind(), trustperm::ErrorKind::Internal);

    assert_eq!(fx.keeper.list_permissions(None, None)?, before);
    assert!(fx.keeper.list_permission_sessions(None, None)?.is_empty());
    Ok(())
}
