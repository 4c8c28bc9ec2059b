use custody_types::{ComponentId, Principal, Role};

use crate::error::RoleError;

/// Capability check interface.
///
/// Lookups fail closed: an implementation that cannot answer (poisoned lock,
/// unreachable backend) must report `false`.
pub trait AccessControl: Send + Sync {
    fn has_role(&self, role: Role, principal: &Principal) -> bool;

    fn member_count(&self, role: Role) -> usize;

    fn is_component_registered(&self, component: &ComponentId) -> bool;

    /// Grant `role` to `principal` on behalf of `caller`.
    /// Returns `false` if the role was already held.
    fn grant_role(&self, caller: &Principal, role: Role, principal: &Principal)
        -> Result<bool, RoleError>;

    /// Revoke `role` from `principal` on behalf of `caller`.
    /// Returns `false` if the role was not held.
    fn revoke_role(&self, caller: &Principal, role: Role, principal: &Principal)
        -> Result<bool, RoleError>;

    fn require_role(&self, role: Role, principal: &Principal) -> Result<(), RoleError> {
        if self.has_role(role, principal) {
            Ok(())
        } else {
            Err(RoleError::Unauthorized {
                principal: principal.clone(),
                required: role,
            })
        }
    }
}
