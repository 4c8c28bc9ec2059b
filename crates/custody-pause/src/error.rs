use custody_quorum::{ProposalId, QuorumError};
use custody_roles::RoleError;
use custody_types::{ComponentId, ErrorKind, Principal, SwitchError};
use thiserror::Error;

/// Errors from the emergency pause controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PauseError {
    // --- Components ---
    #[error("component not registered: {0}")]
    ComponentNotRegistered(ComponentId),

    #[error("component not tracked by the controller: {0}")]
    ComponentNotTracked(ComponentId),

    #[error("component already tracked: {0}")]
    AlreadyTracked(ComponentId),

    #[error("component {0} is still paused")]
    StillPaused(ComponentId),

    // --- Requests ---
    #[error("request names no targets")]
    NoTargets,

    #[error("duplicate target: {0}")]
    DuplicateTarget(ComponentId),

    #[error("component {0} is already paused")]
    AlreadyPaused(ComponentId),

    #[error("component {0} is not paused")]
    NotPaused(ComponentId),

    #[error("request {id} predates the current pause of {component}")]
    StaleRequest { id: ProposalId, component: ComponentId },

    #[error(transparent)]
    Quorum(#[from] QuorumError),

    #[error("switching {component} failed: {source}")]
    SwitchFailed {
        component: ComponentId,
        source: SwitchError,
    },

    // --- Guardians ---
    #[error("{have} guardians registered, at least {need} required")]
    InsufficientGuardians { have: usize, need: usize },

    #[error("required confirmations {requested} outside 1..={guardians}")]
    InvalidConfirmations { requested: usize, guardians: usize },

    #[error(transparent)]
    Access(#[from] RoleError),

    // --- Setup ---
    #[error("invalid principal: {0:?}")]
    InvalidPrincipal(Principal),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("lock error")]
    LockError,
}

impl PauseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PauseError::ComponentNotRegistered(_) | PauseError::ComponentNotTracked(_) => {
                ErrorKind::NotFound
            }
            PauseError::AlreadyTracked(_)
            | PauseError::StillPaused(_)
            | PauseError::NoTargets
            | PauseError::DuplicateTarget(_)
            | PauseError::AlreadyPaused(_)
            | PauseError::NotPaused(_)
            | PauseError::StaleRequest { .. }
            | PauseError::InvalidPrincipal(_)
            | PauseError::LockError => ErrorKind::InvalidState,
            PauseError::InsufficientGuardians { .. }
            | PauseError::InvalidConfirmations { .. }
            | PauseError::InvalidConfig(_) => ErrorKind::InvariantViolation,
            PauseError::Quorum(e) => e.kind(),
            PauseError::SwitchFailed { source, .. } => source.kind(),
            PauseError::Access(e) => e.kind(),
        }
    }
}
