//! Who gets paid for an issuance or verification.

use std::collections::HashSet;

use trustperm_core::{Permission, PermManagementMode, PermissionId};
use trustperm_store::Store;

use crate::error::{KeeperError, Result};
use crate::keeper::Tx;

impl<S: Store> Tx<'_, S> {
    /// Ordered, deduplicated set of permissions owed fees.
    ///
    /// In OPEN mode the schema's active ECOSYSTEM permission is the only
    /// beneficiary, and without one nobody is paid. Otherwise the issuer's
    /// active validator chain is paid, followed, for verifications, by the
    /// issuer itself when unrevoked with no outstanding slash, then the
    /// verifier's active validator chain. Order is discovery order.
    pub(crate) fn find_beneficiaries(
        &self,
        issuer: Option<&Permission>,
        verifier: Option<&Permission>,
    ) -> Result<Vec<Permission>> {
        let schema_id = issuer.or(verifier).map(|p| p.schema_id).ok_or_else(|| {
            KeeperError::InvalidArgument(
                "at least one of issuer or verifier permission is required".into(),
            )
        })?;
        let schema = self.load_schema(schema_id)?;

        let open = (issuer.is_some()
            && schema.issuer_perm_management_mode == PermManagementMode::Open)
            || (verifier.is_some()
                && schema.verifier_perm_management_mode == PermManagementMode::Open);

        if open {
            let Some(ecosystem) = self.find_active_ecosystem_permission(schema_id)? else {
                tracing::warn!(schema = schema_id, "no active ecosystem permission; nothing to pay");
                return Ok(Vec::new());
            };
            return Ok(vec![ecosystem]);
        }

        let mut seen: HashSet<PermissionId> = HashSet::new();
        let mut found = Vec::new();
        let mut push = |perm: Permission, found: &mut Vec<Permission>| {
            if seen.insert(perm.id) {
                found.push(perm);
            }
        };

        if let Some(issuer) = issuer {
            for ancestor in self.active_validator_chain(issuer)? {
                push(ancestor, &mut found);
            }
        }

        if let Some(verifier) = verifier {
            if let Some(issuer) = issuer {
                if issuer.revoked.is_none() && issuer.outstanding_slash() == 0 {
                    push(issuer.clone(), &mut found);
                }
            }
            for ancestor in self.active_validator_chain(verifier)? {
                push(ancestor, &mut found);
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{keeper_with_schema, permission, seeded_store, test_schema};
    use trustperm_core::PermissionType;

    fn ids(perms: &[Permission]) -> Vec<u64> {
        perms.iter().map(|p| p.id.get()).collect()
    }

    fn tree() -> Vec<Permission> {
        vec![
            permission(1, PermissionType::Ecosystem, None, "eco"),
            permission(2, PermissionType::IssuerGrantor, Some(1), "igrantor"),
            permission(3, PermissionType::Issuer, Some(2), "issuer"),
            permission(4, PermissionType::VerifierGrantor, Some(1), "vgrantor"),
            permission(5, PermissionType::Verifier, Some(4), "verifier"),
        ]
    }

    #[test]
    fn test_issuance_pays_issuer_chain() {
        let perms = tree();
        let keeper = keeper_with_schema(seeded_store(perms.clone()), test_schema());

        let found = keeper
            .view(0, |tx| tx.find_beneficiaries(Some(&perms[2]), None))
            .unwrap();
        assert_eq!(ids(&found), vec![2, 1]);
    }

    #[test]
    fn test_verification_includes_issuer_and_dedups() {
        let perms = tree();
        let keeper = keeper_with_schema(seeded_store(perms.clone()), test_schema());

        let found = keeper
            .view(0, |tx| tx.find_beneficiaries(Some(&perms[2]), Some(&perms[4])))
            .unwrap();
        // Ecosystem appears in both chains but only once.
        assert_eq!(ids(&found), vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_slashed_issuer_is_skipped() {
        let mut perms = tree();
        perms[2].slashed_deposit = 5;
        let keeper = keeper_with_schema(seeded_store(perms.clone()), test_schema());

        let found = keeper
            .view(0, |tx| tx.find_beneficiaries(Some(&perms[2]), Some(&perms[4])))
            .unwrap();
        assert_eq!(ids(&found), vec![2, 1, 4]);
    }

    #[test]
    fn test_repaid_issuer_is_paid_again() {
        let mut perms = tree();
        perms[2].slashed_deposit = 5;
        perms[2].repaid_deposit = 5;
        let keeper = keeper_with_schema(seeded_store(perms.clone()), test_schema());

        let found = keeper
            .view(0, |tx| tx.find_beneficiaries(Some(&perms[2]), Some(&perms[4])))
            .unwrap();
        assert_eq!(ids(&found), vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_repaid_ancestor_stays_unpaid() {
        let mut perms = tree();
        perms[1].slashed_deposit = 5;
        perms[1].repaid_deposit = 5;
        let keeper = keeper_with_schema(seeded_store(perms.clone()), test_schema());

        let found = keeper
            .view(0, |tx| tx.find_beneficiaries(Some(&perms[2]), None))
            .unwrap();
        assert_eq!(ids(&found), vec![1]);
    }

    #[test]
    fn test_open_mode_pays_ecosystem_only() {
        let perms = tree();
        let mut schema = test_schema();
        schema.issuer_perm_management_mode = PermManagementMode::Open;
        let keeper = keeper_with_schema(seeded_store(perms.clone()), schema);

        let found = keeper
            .view(0, |tx| tx.find_beneficiaries(Some(&perms[2]), None))
            .unwrap();
        assert_eq!(ids(&found), vec![1]);
    }

    #[test]
    fn test_open_mode_without_ecosystem_pays_nobody() {
        let mut perms = tree();
        perms[0].revoked = Some(1);
        let mut schema = test_schema();
        schema.issuer_perm_management_mode = PermManagementMode::Open;
        let keeper = keeper_with_schema(seeded_store(perms.clone()), schema);

        let found = keeper
            .view(0, |tx| tx.find_beneficiaries(Some(&perms[2]), None))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_requires_one_side() {
        let keeper = keeper_with_schema(seeded_store(tree()), test_schema());
        let err = keeper.view(0, |tx| tx.find_beneficiaries(None, None)).unwrap_err();
        assert!(matches!(err, KeeperError::InvalidArgument(_)));
    }
}
