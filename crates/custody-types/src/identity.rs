use serde::{Deserialize, Serialize};

/// An authenticated identity that can hold roles and be party to operations.
///
/// The core never inspects the contents; it only compares principals for
/// equality. An empty principal plays the role of the null address and is
/// rejected wherever a real recipient or member is required.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal(pub String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the null principal.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Principal {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Capability tags held by principals in the role registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Administers every other role by default.
    Admin,
    /// Manages the treasury signer set and threshold.
    SignerAdmin,
    /// Issues custom rewards.
    Backend,
    /// Proposes and confirms emergency pauses.
    Guardian,
    /// Curates templates and whitelists, lifts pauses.
    Manager,
    /// Allowed to flip a component's pause switch.
    Pauser,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::SignerAdmin,
        Role::Backend,
        Role::Guardian,
        Role::Manager,
        Role::Pauser,
    ];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Admin => "ADMIN",
            Role::SignerAdmin => "SIGNER_ADMIN",
            Role::Backend => "BACKEND",
            Role::Guardian => "GUARDIAN",
            Role::Manager => "MANAGER",
            Role::Pauser => "PAUSER",
        };
        write!(f, "{}", name)
    }
}

/// Identity of a registered component (treasury, reward engine, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub String);

impl ComponentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_principal_is_null() {
        assert!(Principal::new("").is_empty());
        assert!(Principal::new("  ").is_empty());
        assert!(!Principal::new("0xabc").is_empty());
    }

    #[test]
    fn role_serializes_screaming_snake() {
        let json = serde_json::to_string(&Role::SignerAdmin).unwrap();
        assert_eq!(json, "\"SIGNER_ADMIN\"");
        assert_eq!(Role::SignerAdmin.to_string(), "SIGNER_ADMIN");
    }
}
