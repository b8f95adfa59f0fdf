//! Permission sessions: recording issuances and verifications and paying
//! every beneficiary along the way.

use trustperm_core::{Permission, PermissionId, PermissionSession, PermissionType, SessionAuthz};
use trustperm_store::Store;

use crate::error::{KeeperError, Result};
use crate::events::{Event, EventKind};
use crate::fees::{plan_distribution, DistributionPlan, SessionFlavor};
use crate::keeper::{Keeper, Tx};
use crate::msgs::CreateOrUpdatePermissionSession;

impl<S: Store> Tx<'_, S> {
    /// Load a session participant and check its type and validity.
    fn load_participant(
        &self,
        id: PermissionId,
        expected: PermissionType,
        role: &str,
    ) -> Result<Permission> {
        let perm = self.load_permission(id, role)?;
        if perm.perm_type != expected {
            return Err(KeeperError::InvalidArgument(format!(
                "{} permission {} must be {}, is {}",
                role, id, expected, perm.perm_type
            )));
        }
        self.require_valid(&perm, "", role)?;
        Ok(perm)
    }

    pub(crate) fn create_or_update_permission_session(
        &mut self,
        msg: &CreateOrUpdatePermissionSession,
    ) -> Result<DistributionPlan> {
        if msg.id.is_empty() {
            return Err(KeeperError::InvalidArgument("session id is required".into()));
        }
        if msg.issuer_perm_id.is_none() && msg.verifier_perm_id.is_none() {
            return Err(KeeperError::InvalidArgument(
                "at least one of issuer or verifier permission is required".into(),
            ));
        }

        let authz = SessionAuthz {
            executor_perm_id: msg.issuer_perm_id,
            beneficiary_perm_id: msg.verifier_perm_id,
            wallet_agent_perm_id: msg.wallet_agent_perm_id,
        };
        let existing = self.store.get_session(&msg.id)?;
        if let Some(session) = &existing {
            if session.controller != msg.creator {
                return Err(KeeperError::Unauthorized(
                    "only session controller can update".into(),
                ));
            }
            if session.contains(&authz) {
                return Err(KeeperError::Conflict(format!(
                    "authorization already exists in session {}",
                    session.id
                )));
            }
        }

        let issuer = msg
            .issuer_perm_id
            .map(|id| self.load_participant(id, PermissionType::Issuer, "issuer"))
            .transpose()?;
        let verifier = msg
            .verifier_perm_id
            .map(|id| self.load_participant(id, PermissionType::Verifier, "verifier"))
            .transpose()?;
        self.load_participant(msg.agent_perm_id, PermissionType::Issuer, "agent")?;
        if let Some(id) = msg.wallet_agent_perm_id {
            self.load_participant(id, PermissionType::Issuer, "wallet agent")?;
        }

        let (flavor, executor) = match (&verifier, &issuer) {
            (Some(verifier), _) => (SessionFlavor::Verification, verifier),
            (None, Some(issuer)) => (SessionFlavor::Issuance, issuer),
            (None, None) => {
                return Err(KeeperError::InvalidArgument(
                    "session has neither issuer nor verifier".into(),
                ))
            }
        };
        let executor_id = executor.id;
        let discount = flavor.discount_of(executor);

        let beneficiaries = self.find_beneficiaries(issuer.as_ref(), verifier.as_ref())?;
        let plan = plan_distribution(&beneficiaries, flavor, discount, &self.fee_rates())?;
        tracing::debug!(
            session = %msg.id,
            beneficiaries = beneficiaries.len(),
            trust_fees = plan.trust_fees,
            "planned session distribution"
        );

        self.require_balance(&msg.creator, plan.trust_fees)?;
        self.apply_distribution(
            &plan,
            &msg.creator,
            executor_id,
            Some(msg.agent_perm_id),
            msg.wallet_agent_perm_id,
        )?;

        let mut session = existing.unwrap_or_else(|| PermissionSession {
            id: msg.id.clone(),
            controller: msg.creator.clone(),
            agent_perm_id: msg.agent_perm_id,
            created: self.now,
            modified: self.now,
            authz: Vec::new(),
        });
        session.modified = self.now;
        session.authz.push(authz);
        let authz_count = session.authz.len();
        self.store.put_session(session);

        tracing::info!(session = %msg.id, authz_count, trust_fees = plan.trust_fees, "recorded session authorization");
        let mut event = Event::new(EventKind::CreateOrUpdatePermissionSession)
            .attr("session_id", &msg.id)
            .attr("agent_perm_id", msg.agent_perm_id)
            .attr("trust_fees", plan.trust_fees);
        if let Some(id) = msg.issuer_perm_id {
            event = event.attr("issuer_perm_id", id);
        }
        if let Some(id) = msg.verifier_perm_id {
            event = event.attr("verifier_perm_id", id);
        }
        if let Some(id) = msg.wallet_agent_perm_id {
            event = event.attr("wallet_agent_perm_id", id);
        }
        self.emit(event);

        Ok(plan)
    }
}

impl<S: Store> Keeper<S> {
    /// Record an issuance or verification and pay its fees.
    ///
    /// Returns the distribution that was applied.
    pub fn create_or_update_permission_session(
        &self,
        now: i64,
        msg: CreateOrUpdatePermissionSession,
    ) -> Result<DistributionPlan> {
        self.transact(now, |tx| tx.create_or_update_permission_session(&msg))
    }
}
