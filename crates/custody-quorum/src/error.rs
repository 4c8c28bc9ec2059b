use chrono::{DateTime, Utc};
use custody_types::{ErrorKind, Principal};
use thiserror::Error;

use crate::proposal::ProposalId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuorumError {
    #[error("proposal not found: {0}")]
    NotFound(ProposalId),

    #[error("{principal} already confirmed proposal {id}")]
    AlreadyConfirmed { id: ProposalId, principal: Principal },

    #[error("{principal} has not confirmed proposal {id}")]
    NotConfirmed { id: ProposalId, principal: Principal },

    #[error("proposal {0} already executed")]
    AlreadyExecuted(ProposalId),

    #[error("proposal {0} expired")]
    Expired(ProposalId),

    #[error("proposal {0} cancelled")]
    Cancelled(ProposalId),

    #[error("proposal {0} failed and is closed")]
    Failed(ProposalId),

    #[error("proposal {id} has {have} of {need} confirmations")]
    InsufficientConfirmations {
        id: ProposalId,
        have: usize,
        need: usize,
    },

    #[error("proposal {id} not executable before {ready_at}")]
    DelayNotElapsed {
        id: ProposalId,
        ready_at: DateTime<Utc>,
    },

    #[error("proposal {0} has not expired")]
    NotExpired(ProposalId),

    #[error("invalid quorum policy: {0}")]
    InvalidPolicy(String),
}

impl QuorumError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuorumError::NotFound(_) => ErrorKind::NotFound,
            QuorumError::InvalidPolicy(_) => ErrorKind::InvariantViolation,
            QuorumError::AlreadyConfirmed { .. }
            | QuorumError::NotConfirmed { .. }
            | QuorumError::AlreadyExecuted(_)
            | QuorumError::Expired(_)
            | QuorumError::Cancelled(_)
            | QuorumError::Failed(_)
            | QuorumError::InsufficientConfirmations { .. }
            | QuorumError::DelayNotElapsed { .. }
            | QuorumError::NotExpired(_) => ErrorKind::InvalidState,
        }
    }
}
