use custody_quorum::{ProposalId, QuorumError};
use custody_roles::RoleError;
use custody_types::{Amount, ErrorKind, LedgerError, Principal};
use thiserror::Error;

/// Errors from the multisig treasury.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreasuryError {
    // --- Authorization ---
    #[error("{0} is not a signer")]
    NotSigner(Principal),

    #[error(transparent)]
    Access(#[from] RoleError),

    // --- Lifecycle ---
    #[error(transparent)]
    Quorum(#[from] QuorumError),

    #[error("treasury is paused")]
    Paused,

    #[error("treasury is not paused")]
    NotPaused,

    #[error("transaction {id} call failed: {reason}")]
    CallFailed { id: ProposalId, reason: String },

    #[error("transaction {id} call failed and the transfer could not be reverted: {reason}")]
    RollbackFailed { id: ProposalId, reason: String },

    // --- Signer set invariants ---
    #[error("signer set must not be empty")]
    NoSigners,

    #[error("signer set would exceed {max} signers")]
    TooManySigners { max: usize },

    #[error("duplicate signer: {0}")]
    DuplicateSigner(Principal),

    #[error("signer not found: {0}")]
    SignerNotFound(Principal),

    #[error("threshold {threshold} invalid for {signers} signers")]
    InvalidThreshold { threshold: usize, signers: usize },

    // --- Limits ---
    #[error("estimated cost {estimated} exceeds limit {limit}")]
    ResourceExceeded { estimated: u64, limit: u64 },

    #[error("batch of {size} exceeds maximum {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("page size {size} outside 1..={max}")]
    InvalidPageSize { size: usize, max: usize },

    #[error("emergency withdrawal of {amount} exceeds limit {max}")]
    EmergencyLimitExceeded { amount: Amount, max: Amount },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // --- Input ---
    #[error("page {0} out of bounds")]
    PageOutOfBounds(usize),

    #[error("empty batch")]
    EmptyBatch,

    #[error("invalid principal: {0:?}")]
    InvalidPrincipal(Principal),

    #[error("amount must be positive")]
    InvalidAmount,

    // --- Emergency withdrawal ---
    #[error("{0} already approved the emergency withdrawal")]
    AlreadyApprovedEmergency(Principal),

    #[error("an emergency withdrawal of {amount} to {recipient} is already awaiting approvals")]
    EmergencyMismatch { recipient: Principal, amount: Amount },

    #[error("invalid treasury configuration: {0}")]
    InvalidConfig(String),

    #[error("lock error")]
    LockError,
}

impl TreasuryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TreasuryError::NotSigner(_) => ErrorKind::Unauthorized,
            TreasuryError::Access(e) => e.kind(),
            TreasuryError::Quorum(e) => e.kind(),
            TreasuryError::Ledger(e) => e.kind(),
            TreasuryError::Paused
            | TreasuryError::NotPaused
            | TreasuryError::CallFailed { .. }
            | TreasuryError::EmptyBatch
            | TreasuryError::InvalidPrincipal(_)
            | TreasuryError::InvalidAmount
            | TreasuryError::AlreadyApprovedEmergency(_)
            | TreasuryError::EmergencyMismatch { .. }
            | TreasuryError::LockError => ErrorKind::InvalidState,
            TreasuryError::NoSigners
            | TreasuryError::TooManySigners { .. }
            | TreasuryError::DuplicateSigner(_)
            | TreasuryError::InvalidThreshold { .. }
            | TreasuryError::RollbackFailed { .. }
            | TreasuryError::InvalidConfig(_) => ErrorKind::InvariantViolation,
            TreasuryError::SignerNotFound(_) | TreasuryError::PageOutOfBounds(_) => {
                ErrorKind::NotFound
            }
            TreasuryError::ResourceExceeded { .. }
            | TreasuryError::BatchTooLarge { .. }
            | TreasuryError::InvalidPageSize { .. }
            | TreasuryError::EmergencyLimitExceeded { .. } => ErrorKind::LimitExceeded,
        }
    }
}
