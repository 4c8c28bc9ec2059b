use custody_types::{ComponentId, ErrorKind, Principal, Role};
use thiserror::Error;

/// Errors from the role registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleError {
    #[error("{principal} lacks role {required}")]
    Unauthorized { principal: Principal, required: Role },

    #[error("cannot remove the last {0} holder")]
    LastAdmin(Role),

    #[error("invalid principal: {0:?}")]
    InvalidPrincipal(Principal),

    #[error("principals may only renounce their own roles")]
    RenounceForOther,

    #[error("component already registered: {0}")]
    AlreadyRegistered(ComponentId),

    #[error("component not registered: {0}")]
    ComponentNotFound(ComponentId),

    #[error("empty batch")]
    EmptyBatch,

    #[error("lock error")]
    LockError,
}

impl RoleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoleError::Unauthorized { .. } | RoleError::RenounceForOther => ErrorKind::Unauthorized,
            RoleError::LastAdmin(_) => ErrorKind::InvariantViolation,
            RoleError::InvalidPrincipal(_) | RoleError::EmptyBatch | RoleError::LockError => {
                ErrorKind::InvalidState
            }
            RoleError::AlreadyRegistered(_) => ErrorKind::InvalidState,
            RoleError::ComponentNotFound(_) => ErrorKind::NotFound,
        }
    }
}
