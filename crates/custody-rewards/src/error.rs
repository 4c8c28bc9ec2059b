use chrono::{DateTime, Utc};
use custody_roles::RoleError;
use custody_types::{Amount, ErrorKind, LedgerError, Principal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which daily window a claim ran into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitScope {
    Global,
    Template(String),
}

impl std::fmt::Display for LimitScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitScope::Global => write!(f, "global"),
            LimitScope::Template(id) => write!(f, "template {}", id),
        }
    }
}

/// Errors from the reward distribution engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewardError {
    // --- Engine state ---
    #[error("reward engine is paused")]
    Paused,

    #[error("reward engine is not paused")]
    NotPaused,

    // --- Templates ---
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("template not active: {0}")]
    TemplateInactive(String),

    #[error("template {0} has no fixed amount; issue it as a custom reward")]
    CustomAmountTemplate(String),

    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    // --- Eligibility ---
    #[error("{0} is not whitelisted")]
    NotWhitelisted(Principal),

    #[error("{principal} already claimed {template}")]
    AlreadyClaimed { template: String, principal: Principal },

    #[error("{template} on cooldown until {available_at}")]
    CooldownActive {
        template: String,
        available_at: DateTime<Utc>,
    },

    #[error("self-referral is not allowed")]
    SelfReferral,

    #[error("{0} was already referred")]
    AlreadyReferred(Principal),

    // --- Limits ---
    #[error("{scope} daily limit exceeded: requested {requested}, remaining {remaining}")]
    DailyLimitExceeded {
        scope: LimitScope,
        requested: Amount,
        remaining: Amount,
    },

    #[error("distributor balance {available} below required {required}")]
    InsufficientTreasuryBalance { required: Amount, available: Amount },

    #[error("amount {amount} outside 1..={max}")]
    InvalidAmount { amount: Amount, max: Amount },

    // --- Authorization ---
    #[error("{0} is not the configured treasury")]
    NotTreasury(Principal),

    #[error(transparent)]
    Access(#[from] RoleError),

    // --- Collaborators ---
    #[error("invalid principal: {0:?}")]
    InvalidPrincipal(Principal),

    #[error(transparent)]
    Ledger(LedgerError),

    #[error("lock error")]
    LockError,
}

impl From<LedgerError> for RewardError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientBalance {
                required,
                available,
                ..
            } => RewardError::InsufficientTreasuryBalance {
                required,
                available,
            },
            other => RewardError::Ledger(other),
        }
    }
}

impl RewardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RewardError::Paused
            | RewardError::NotPaused
            | RewardError::TemplateInactive(_)
            | RewardError::CustomAmountTemplate(_)
            | RewardError::AlreadyClaimed { .. }
            | RewardError::CooldownActive { .. }
            | RewardError::SelfReferral
            | RewardError::AlreadyReferred(_)
            | RewardError::InvalidPrincipal(_)
            | RewardError::LockError => ErrorKind::InvalidState,
            RewardError::TemplateNotFound(_) => ErrorKind::NotFound,
            RewardError::InvalidTemplate(_) => ErrorKind::InvariantViolation,
            RewardError::NotWhitelisted(_) | RewardError::NotTreasury(_) => {
                ErrorKind::Unauthorized
            }
            RewardError::DailyLimitExceeded { .. }
            | RewardError::InsufficientTreasuryBalance { .. }
            | RewardError::InvalidAmount { .. } => ErrorKind::LimitExceeded,
            RewardError::Access(e) => e.kind(),
            RewardError::Ledger(e) => e.kind(),
        }
    }
}
