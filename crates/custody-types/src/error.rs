use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::Principal;
use crate::ledger::Amount;

/// Coarse classification shared by every component error.
///
/// Callers (administration tooling, monitoring) branch on the kind; the
/// concrete error carries the detail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Caller lacks the required role, signer or guardian status.
    Unauthorized,
    /// Target is not in an eligible lifecycle state.
    InvalidState,
    /// A daily cap, balance or resource ceiling would be exceeded.
    LimitExceeded,
    /// A structural invariant (signer count, last admin, ...) would break.
    InvariantViolation,
    /// Unknown id, principal or template.
    NotFound,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Errors from the ledger collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance on {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: Principal,
        required: Amount,
        available: Amount,
    },

    #[error("balance overflow on {account}")]
    Overflow { account: Principal },

    #[error("invalid ledger account: {0:?}")]
    InvalidAccount(Principal),

    #[error("lock error")]
    LockError,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InsufficientBalance { .. } | LedgerError::Overflow { .. } => {
                ErrorKind::LimitExceeded
            }
            LedgerError::InvalidAccount(_) => ErrorKind::NotFound,
            LedgerError::LockError => ErrorKind::InvalidState,
        }
    }
}

/// Errors raised by a component's pause switch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwitchError {
    #[error("{0} may not operate this pause switch")]
    Unauthorized(Principal),

    #[error("pause switch unavailable: {0}")]
    Unavailable(String),
}

impl SwitchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SwitchError::Unauthorized(_) => ErrorKind::Unauthorized,
            SwitchError::Unavailable(_) => ErrorKind::InvalidState,
        }
    }
}
