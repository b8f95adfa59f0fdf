//! Error types for the keeper.

use thiserror::Error;
use trustperm_core::DecimalError;
use trustperm_store::StoreError;

use crate::collaborators::CollaboratorError;

/// Coarse error classification, stable across message wording changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Unauthorized,
    InvalidState,
    InsufficientFunds,
    Conflict,
    /// Storage, arithmetic or collaborator failure.
    Internal,
}

/// Errors that can occur during keeper operations.
///
/// Any error aborts the handler; none of its store writes are committed.
#[derive(Debug, Error)]
pub enum KeeperError {
    /// A referenced permission, schema, registry or session does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request is malformed or violates a business rule.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller is not allowed to perform the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A permission is in the wrong state, or is not valid right now.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The payer cannot cover the required amount.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The change would duplicate existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Fixed-point arithmetic error.
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] DecimalError),

    /// A collaborating module rejected a call.
    #[error("collaborator error: {0}")]
    Collaborator(String),
}

impl KeeperError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeeperError::NotFound(_) => ErrorKind::NotFound,
            KeeperError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            KeeperError::Unauthorized(_) => ErrorKind::Unauthorized,
            KeeperError::InvalidState(_) => ErrorKind::InvalidState,
            KeeperError::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            KeeperError::Conflict(_) => ErrorKind::Conflict,
            KeeperError::Store(_) | KeeperError::Arithmetic(_) | KeeperError::Collaborator(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<CollaboratorError> for KeeperError {
    fn from(e: CollaboratorError) -> Self {
        match e {
            CollaboratorError::InsufficientFunds(msg) => KeeperError::InsufficientFunds(msg),
            CollaboratorError::Failed(msg) => KeeperError::Collaborator(msg),
        }
    }
}

/// Result type for keeper operations.
pub type Result<T> = std::result::Result<T, KeeperError>;
