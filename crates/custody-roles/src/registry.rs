use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use custody_types::{AuditEvent, Clock, ComponentId, CustodyEvent, EventSink, Principal, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::access::AccessControl;
use crate::error::RoleError;

/// A component identity recorded for pause and role scoping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredComponent {
    pub id: ComponentId,
    pub label: String,
    pub registered_at: DateTime<Utc>,
    pub registered_by: Principal,
}

#[derive(Debug, Default)]
struct RegistryState {
    members: HashMap<Role, BTreeSet<Principal>>,
    role_admins: HashMap<Role, Role>,
    components: BTreeMap<ComponentId, RegisteredComponent>,
}

impl RegistryState {
    fn holds(&self, role: Role, principal: &Principal) -> bool {
        self.members
            .get(&role)
            .is_some_and(|set| set.contains(principal))
    }

    fn count(&self, role: Role) -> usize {
        self.members.get(&role).map_or(0, BTreeSet::len)
    }

    fn admin_of(&self, role: Role) -> Role {
        self.role_admins
            .get(&role)
            .copied()
            .unwrap_or_else(|| default_role_admin(role))
    }

    fn require_admin_of(&self, role: Role, caller: &Principal) -> Result<(), RoleError> {
        let required = self.admin_of(role);
        if self.holds(required, caller) {
            Ok(())
        } else {
            Err(RoleError::Unauthorized {
                principal: caller.clone(),
                required,
            })
        }
    }
}

/// Managers authorize backends; everything else is administered by admins.
fn default_role_admin(role: Role) -> Role {
    match role {
        Role::Backend => Role::Manager,
        _ => Role::Admin,
    }
}

fn check_principal(principal: &Principal) -> Result<(), RoleError> {
    if principal.is_empty() {
        return Err(RoleError::InvalidPrincipal(principal.clone()));
    }
    Ok(())
}

/// Role registry: principal → role grants.
///
/// Invariant: from construction on, at least one principal holds
/// [`Role::Admin`]. Every path that could remove the last admin (revoke,
/// batch revoke, renounce, admin transfer) is rejected with
/// [`RoleError::LastAdmin`].
pub struct RoleRegistry {
    id: ComponentId,
    state: RwLock<RegistryState>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl RoleRegistry {
    pub const COMPONENT: &'static str = "role-registry";

    pub fn new(
        initial_admin: Principal,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, RoleError> {
        check_principal(&initial_admin)?;

        let mut state = RegistryState::default();
        state
            .members
            .entry(Role::Admin)
            .or_default()
            .insert(initial_admin.clone());

        info!(admin = %initial_admin, "Role registry initialized");

        Ok(Self {
            id: ComponentId::new(Self::COMPONENT),
            state: RwLock::new(state),
            clock,
            events,
        })
    }

    fn emit(&self, event: CustodyEvent) {
        self.events
            .emit(AuditEvent::new(self.id.clone(), self.clock.now(), event));
    }

    // --- Role administration ---

    /// The role whose holders may grant and revoke `role`.
    pub fn role_admin(&self, role: Role) -> Role {
        self.state
            .read()
            .map(|s| s.admin_of(role))
            .unwrap_or_else(|_| default_role_admin(role))
    }

    pub fn set_role_admin(
        &self,
        caller: &Principal,
        role: Role,
        admin_role: Role,
    ) -> Result<(), RoleError> {
        let mut state = self.state.write().map_err(|_| RoleError::LockError)?;
        state.require_admin_of(Role::Admin, caller)?;

        let previous = state.admin_of(role);
        if previous == admin_role {
            debug!(role = %role, admin_role = %admin_role, "Role admin unchanged");
            return Ok(());
        }
        state.role_admins.insert(role, admin_role);

        info!(role = %role, previous = %previous, new = %admin_role, "Role admin changed");
        self.emit(CustodyEvent::RoleAdminChanged {
            role,
            previous,
            new: admin_role,
        });
        Ok(())
    }

    fn grant_locked(
        &self,
        state: &mut RegistryState,
        caller: &Principal,
        role: Role,
        principal: &Principal,
    ) -> bool {
        let inserted = state
            .members
            .entry(role)
            .or_default()
            .insert(principal.clone());
        if inserted {
            info!(role = %role, principal = %principal, by = %caller, "Role granted");
            self.emit(CustodyEvent::RoleGranted {
                role,
                principal: principal.clone(),
                by: caller.clone(),
            });
        } else {
            debug!(role = %role, principal = %principal, "Role already held");
        }
        inserted
    }

    fn revoke_locked(
        &self,
        state: &mut RegistryState,
        caller: &Principal,
        role: Role,
        principal: &Principal,
    ) -> Result<bool, RoleError> {
        if !state.holds(role, principal) {
            debug!(role = %role, principal = %principal, "Role not held");
            return Ok(false);
        }
        if role == Role::Admin && state.count(Role::Admin) == 1 {
            warn!(principal = %principal, "Refusing to remove last admin");
            return Err(RoleError::LastAdmin(Role::Admin));
        }
        if let Some(set) = state.members.get_mut(&role) {
            set.remove(principal);
        }
        warn!(role = %role, principal = %principal, by = %caller, "Role revoked");
        self.emit(CustodyEvent::RoleRevoked {
            role,
            principal: principal.clone(),
            by: caller.clone(),
        });
        Ok(true)
    }

    pub fn grant_role(
        &self,
        caller: &Principal,
        role: Role,
        principal: &Principal,
    ) -> Result<bool, RoleError> {
        check_principal(principal)?;
        let mut state = self.state.write().map_err(|_| RoleError::LockError)?;
        state.require_admin_of(role, caller)?;
        Ok(self.grant_locked(&mut state, caller, role, principal))
    }

    pub fn revoke_role(
        &self,
        caller: &Principal,
        role: Role,
        principal: &Principal,
    ) -> Result<bool, RoleError> {
        let mut state = self.state.write().map_err(|_| RoleError::LockError)?;
        state.require_admin_of(role, caller)?;
        self.revoke_locked(&mut state, caller, role, principal)
    }

    /// Grant `role` to every principal in `principals`. All-or-nothing:
    /// nothing is granted unless the caller is authorized and every
    /// principal is valid. Returns the number of new grants.
    pub fn batch_grant_role(
        &self,
        caller: &Principal,
        role: Role,
        principals: &[Principal],
    ) -> Result<usize, RoleError> {
        if principals.is_empty() {
            return Err(RoleError::EmptyBatch);
        }
        principals.iter().try_for_each(check_principal)?;

        let mut state = self.state.write().map_err(|_| RoleError::LockError)?;
        state.require_admin_of(role, caller)?;

        Ok(principals
            .iter()
            .filter(|p| self.grant_locked(&mut state, caller, role, p))
            .count())
    }

    /// Revoke `role` from every principal in `principals`. All-or-nothing,
    /// including the last-admin check over the whole batch.
    pub fn batch_revoke_role(
        &self,
        caller: &Principal,
        role: Role,
        principals: &[Principal],
    ) -> Result<usize, RoleError> {
        if principals.is_empty() {
            return Err(RoleError::EmptyBatch);
        }
        let mut state = self.state.write().map_err(|_| RoleError::LockError)?;
        state.require_admin_of(role, caller)?;

        if role == Role::Admin {
            let removing: BTreeSet<&Principal> = principals
                .iter()
                .filter(|p| state.holds(Role::Admin, p))
                .collect();
            if removing.len() >= state.count(Role::Admin) {
                warn!(batch = principals.len(), "Batch revoke would remove every admin");
                return Err(RoleError::LastAdmin(Role::Admin));
            }
        }

        let mut revoked = 0;
        for principal in principals {
            if self.revoke_locked(&mut state, caller, role, principal)? {
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    /// Drop a role the caller holds.
    pub fn renounce_role(
        &self,
        caller: &Principal,
        role: Role,
        principal: &Principal,
    ) -> Result<bool, RoleError> {
        if caller != principal {
            return Err(RoleError::RenounceForOther);
        }
        let mut state = self.state.write().map_err(|_| RoleError::LockError)?;
        self.revoke_locked(&mut state, caller, role, principal)
    }

    /// Hand the admin role from `caller` to `new_admin`.
    pub fn transfer_admin(&self, caller: &Principal, new_admin: &Principal) -> Result<(), RoleError> {
        check_principal(new_admin)?;
        let mut state = self.state.write().map_err(|_| RoleError::LockError)?;
        state.require_admin_of(Role::Admin, caller)?;
        if !state.holds(Role::Admin, caller) {
            return Err(RoleError::Unauthorized {
                principal: caller.clone(),
                required: Role::Admin,
            });
        }
        if caller == new_admin {
            return Ok(());
        }

        self.grant_locked(&mut state, caller, Role::Admin, new_admin);
        self.revoke_locked(&mut state, caller, Role::Admin, caller)?;
        info!(from = %caller, to = %new_admin, "Admin transferred");
        Ok(())
    }

    // --- Queries ---

    pub fn has_role(&self, role: Role, principal: &Principal) -> bool {
        self.state
            .read()
            .map(|s| s.holds(role, principal))
            .unwrap_or(false)
    }

    pub fn members(&self, role: Role) -> Vec<Principal> {
        self.state
            .read()
            .map(|s| {
                s.members
                    .get(&role)
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    pub fn member_count(&self, role: Role) -> usize {
        self.state.read().map(|s| s.count(role)).unwrap_or(0)
    }

    pub fn roles_of(&self, principal: &Principal) -> Vec<Role> {
        self.state
            .read()
            .map(|s| {
                Role::ALL
                    .into_iter()
                    .filter(|r| s.holds(*r, principal))
                    .collect()
            })
            .unwrap_or_default()
    }

    // --- Component registration ---

    pub fn register_component(
        &self,
        caller: &Principal,
        component: ComponentId,
        label: impl Into<String>,
    ) -> Result<(), RoleError> {
        let label = label.into();
        let mut state = self.state.write().map_err(|_| RoleError::LockError)?;
        state.require_admin_of(Role::Admin, caller)?;
        if component.as_str().trim().is_empty() {
            return Err(RoleError::ComponentNotFound(component));
        }
        if state.components.contains_key(&component) {
            return Err(RoleError::AlreadyRegistered(component));
        }

        let record = RegisteredComponent {
            id: component.clone(),
            label: label.clone(),
            registered_at: self.clock.now(),
            registered_by: caller.clone(),
        };
        state.components.insert(component.clone(), record);

        info!(component = %component, label = %label, "Component registered");
        self.emit(CustodyEvent::ComponentRegistered { component, label });
        Ok(())
    }

    pub fn deregister_component(
        &self,
        caller: &Principal,
        component: &ComponentId,
    ) -> Result<(), RoleError> {
        let mut state = self.state.write().map_err(|_| RoleError::LockError)?;
        state.require_admin_of(Role::Admin, caller)?;
        if state.components.remove(component).is_none() {
            return Err(RoleError::ComponentNotFound(component.clone()));
        }

        warn!(component = %component, "Component deregistered");
        self.emit(CustodyEvent::ComponentDeregistered {
            component: component.clone(),
        });
        Ok(())
    }

    pub fn component_label(&self, component: &ComponentId) -> Option<String> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.components.get(component).map(|c| c.label.clone()))
    }

    pub fn registered_components(&self) -> Vec<RegisteredComponent> {
        self.state
            .read()
            .map(|s| s.components.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl AccessControl for RoleRegistry {
    fn has_role(&self, role: Role, principal: &Principal) -> bool {
        RoleRegistry::has_role(self, role, principal)
    }

    fn member_count(&self, role: Role) -> usize {
        RoleRegistry::member_count(self, role)
    }

    fn is_component_registered(&self, component: &ComponentId) -> bool {
        self.state
            .read()
            .map(|s| s.components.contains_key(component))
            .unwrap_or(false)
    }

    fn grant_role(
        &self,
        caller: &Principal,
        role: Role,
        principal: &Principal,
    ) -> Result<bool, RoleError> {
        RoleRegistry::grant_role(self, caller, role, principal)
    }

    fn revoke_role(
        &self,
        caller: &Principal,
        role: Role,
        principal: &Principal,
    ) -> Result<bool, RoleError> {
        RoleRegistry::revoke_role(self, caller, role, principal)
    }
}
