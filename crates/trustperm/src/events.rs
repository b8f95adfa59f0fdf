//! Events emitted after successful state changes.
//!
//! Events are collected while a handler runs and emitted only after its
//! writes are committed. Emission cannot fail the handler.

use std::fmt;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CreateRootPermission,
    CreatePermission,
    StartPermissionVp,
    RenewPermissionVp,
    SetPermissionVpToValidated,
    CancelPermissionVpLastRequest,
    TerminatePermissionVp,
    ExtendPermission,
    RevokePermission,
    SlashPermissionTrustDeposit,
    RepayPermissionSlashedTrustDeposit,
    CreateOrUpdatePermissionSession,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::CreateRootPermission => "create_root_permission",
            EventKind::CreatePermission => "create_permission",
            EventKind::StartPermissionVp => "start_permission_vp",
            EventKind::RenewPermissionVp => "renew_permission_vp",
            EventKind::SetPermissionVpToValidated => "set_permission_vp_to_validated",
            EventKind::CancelPermissionVpLastRequest => "cancel_permission_vp_last_request",
            EventKind::TerminatePermissionVp => "terminate_permission_vp",
            EventKind::ExtendPermission => "extend_permission",
            EventKind::RevokePermission => "revoke_permission",
            EventKind::SlashPermissionTrustDeposit => "slash_permission_trust_deposit",
            EventKind::RepayPermissionSlashedTrustDeposit => {
                "repay_permission_slashed_trust_deposit"
            }
            EventKind::CreateOrUpdatePermissionSession => "create_or_update_permission_session",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event with string attributes, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub attributes: Vec<(&'static str, String)>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            attributes: Vec::new(),
        }
    }

    /// Append an attribute.
    pub fn attr(mut self, key: &'static str, value: impl ToString) -> Self {
        self.attributes.push((key, value.to_string()));
        self
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Receives committed events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Default sink: logs each event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: Event) {
        tracing::info!(
            event = event.kind.as_str(),
            attributes = ?event.attributes,
            "permission event"
        );
    }
}
