use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use custody_quorum::{Proposal, ProposalBook, ProposalId, QuorumPolicy};
use custody_roles::CustodyContext;
use custody_types::{ComponentId, CustodyEvent, Pausable, PauseKind, Principal, Role};
use tracing::{debug, error, info, warn};

use crate::config::PauseConfig;
use crate::error::PauseError;
use crate::types::{
    ActivePause, ComponentStatus, HistoryAction, PauseAction, PauseHistoryEntry, PauseRequestView,
    RequestOutcome,
};

struct ControllerState {
    components: BTreeMap<ComponentId, Arc<dyn Pausable>>,
    active: BTreeMap<ComponentId, ActivePause>,
    book: ProposalBook<PauseAction>,
    required_confirmations: usize,
    history: Vec<PauseHistoryEntry>,
}

impl ControllerState {
    fn active_at(&self, component: &ComponentId, now: DateTime<Utc>) -> Option<&ActivePause> {
        self.active.get(component).filter(|a| now < a.until)
    }

    fn record(&mut self, component: &ComponentId, request: Option<ProposalId>, action: HistoryAction, at: DateTime<Utc>) {
        self.history.push(PauseHistoryEntry {
            component: component.clone(),
            request,
            action,
            at,
        });
    }
}

/// Guardian-quorum emergency pause controller.
///
/// The controller acts on components through [`Pausable`] using its own
/// `authority` principal, which must hold the pauser role. Pauses it engages
/// carry their expiry, so a component thaws at `created_at + 72h` even if
/// nobody calls [`EmergencyPauseController::expire_pauses`].
pub struct EmergencyPauseController {
    id: ComponentId,
    authority: Principal,
    config: PauseConfig,
    state: RwLock<ControllerState>,
    ctx: CustodyContext,
}

impl std::fmt::Debug for EmergencyPauseController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmergencyPauseController")
            .field("id", &self.id)
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}

impl EmergencyPauseController {
    pub fn new(config: PauseConfig, authority: Principal, ctx: CustodyContext) -> Result<Self, PauseError> {
        if authority.is_empty() {
            return Err(PauseError::InvalidPrincipal(authority));
        }
        if config.max_pause_duration_secs == 0 {
            return Err(PauseError::InvalidConfig(
                "max pause duration must be positive".into(),
            ));
        }
        let guardians = ctx.access.member_count(Role::Guardian);
        if guardians < config.min_guardians {
            return Err(PauseError::InsufficientGuardians {
                have: guardians,
                need: config.min_guardians,
            });
        }
        if config.required_confirmations == 0 || config.required_confirmations > guardians {
            return Err(PauseError::InvalidConfirmations {
                requested: config.required_confirmations,
                guardians,
            });
        }

        info!(
            authority = %authority,
            guardians,
            required_confirmations = config.required_confirmations,
            "Emergency pause controller initialized"
        );

        Ok(Self {
            id: ComponentId::new(config.component_id.clone()),
            authority,
            state: RwLock::new(ControllerState {
                components: BTreeMap::new(),
                active: BTreeMap::new(),
                book: ProposalBook::new(),
                required_confirmations: config.required_confirmations,
                history: Vec::new(),
            }),
            config,
            ctx,
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ControllerState>, PauseError> {
        self.state.write().map_err(|_| PauseError::LockError)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ControllerState>, PauseError> {
        self.state.read().map_err(|_| PauseError::LockError)
    }

    fn emit(&self, event: CustodyEvent) {
        self.ctx.emit(&self.id, event);
    }

    fn policy(&self, required: usize) -> Result<QuorumPolicy, PauseError> {
        Ok(QuorumPolicy::immediate(
            required,
            self.config.max_pause_duration(),
        )?)
    }

    fn is_guardian(&self, principal: &Principal) -> bool {
        self.ctx.access.has_role(Role::Guardian, principal)
    }

    // --- Components ---

    /// Start tracking a registered component.
    pub fn add_component(&self, caller: &Principal, component: Arc<dyn Pausable>) -> Result<(), PauseError> {
        self.ctx.access.require_role(Role::Manager, caller)?;
        let id = component.component_id();
        if !self.ctx.access.is_component_registered(&id) {
            return Err(PauseError::ComponentNotRegistered(id));
        }

        let mut state = self.write()?;
        if state.components.contains_key(&id) {
            return Err(PauseError::AlreadyTracked(id));
        }
        state.components.insert(id.clone(), component);

        info!(component = %id, by = %caller, "Component tracked");
        self.emit(CustodyEvent::ComponentTracked { component: id });
        Ok(())
    }

    /// Stop tracking a component. A component under an active pause cannot
    /// be removed.
    pub fn remove_component(&self, caller: &Principal, component: &ComponentId) -> Result<(), PauseError> {
        self.ctx.access.require_role(Role::Manager, caller)?;
        let now = self.ctx.clock.now();
        let mut state = self.write()?;
        if !state.components.contains_key(component) {
            return Err(PauseError::ComponentNotTracked(component.clone()));
        }
        if state.active_at(component, now).is_some() {
            return Err(PauseError::StillPaused(component.clone()));
        }
        state.components.remove(component);
        state.active.remove(component);

        warn!(component = %component, by = %caller, "Component untracked");
        self.emit(CustodyEvent::ComponentUntracked {
            component: component.clone(),
        });
        Ok(())
    }

    // --- Requests ---

    /// Open a pause request for one component.
    pub fn request_pause(
        &self,
        caller: &Principal,
        component: &ComponentId,
        reason: impl Into<String>,
    ) -> Result<RequestOutcome, PauseError> {
        self.open_request(caller, PauseKind::Pause, vec![component.clone()], reason.into())
    }

    /// Open a single request pausing several components together.
    pub fn request_pause_many(
        &self,
        caller: &Principal,
        targets: &[ComponentId],
        reason: impl Into<String>,
    ) -> Result<RequestOutcome, PauseError> {
        self.open_request(caller, PauseKind::Pause, targets.to_vec(), reason.into())
    }

    /// Open a request pausing every tracked component not already paused.
    pub fn request_pause_all(&self, caller: &Principal, reason: impl Into<String>) -> Result<RequestOutcome, PauseError> {
        let now = self.ctx.clock.now();
        let targets: Vec<ComponentId> = {
            let state = self.read()?;
            state
                .components
                .keys()
                .filter(|c| state.active_at(c, now).is_none())
                .cloned()
                .collect()
        };
        self.open_request(caller, PauseKind::Pause, targets, reason.into())
    }

    /// Open a request lifting the pause on `targets` ahead of expiry.
    pub fn request_unpause(
        &self,
        caller: &Principal,
        targets: &[ComponentId],
        reason: impl Into<String>,
    ) -> Result<RequestOutcome, PauseError> {
        self.open_request(caller, PauseKind::Unpause, targets.to_vec(), reason.into())
    }

    fn validate_targets(
        state: &ControllerState,
        kind: PauseKind,
        targets: &[ComponentId],
        now: DateTime<Utc>,
    ) -> Result<(), PauseError> {
        if targets.is_empty() {
            return Err(PauseError::NoTargets);
        }
        let mut seen = BTreeSet::new();
        for target in targets {
            if !seen.insert(target) {
                return Err(PauseError::DuplicateTarget(target.clone()));
            }
            if !state.components.contains_key(target) {
                return Err(PauseError::ComponentNotTracked(target.clone()));
            }
            let paused = state.active_at(target, now).is_some();
            match kind {
                PauseKind::Pause if paused => return Err(PauseError::AlreadyPaused(target.clone())),
                PauseKind::Unpause if !paused => return Err(PauseError::NotPaused(target.clone())),
                _ => {}
            }
        }
        Ok(())
    }

    fn open_request(
        &self,
        caller: &Principal,
        kind: PauseKind,
        targets: Vec<ComponentId>,
        reason: String,
    ) -> Result<RequestOutcome, PauseError> {
        if let Err(e) = self.ctx.access.require_role(Role::Guardian, caller) {
            warn!(caller = %caller, kind = ?kind, "Pause request from non-guardian");
            return Err(e.into());
        }
        let now = self.ctx.clock.now();
        let mut guard = self.write()?;
        let state = &mut *guard;
        Self::validate_targets(state, kind, &targets, now)?;

        let required = state.required_confirmations;
        let id = state.book.open(
            caller.clone(),
            PauseAction {
                kind,
                targets: targets.clone(),
                reason: reason.clone(),
            },
            now,
        );

        let mut events = vec![CustodyEvent::PauseRequested {
            id: id.0,
            kind,
            targets,
            proposer: caller.clone(),
            reason,
        }];
        let activated = required <= 1;
        if activated {
            match self.activate(state, id, caller, now) {
                Ok(mut applied) => events.append(&mut applied),
                Err(e) => {
                    let _ = state.book.discard(id);
                    return Err(e);
                }
            }
        }

        info!(id = %id, kind = ?kind, proposer = %caller, activated, "Pause request opened");
        for event in events {
            self.emit(event);
        }
        Ok(RequestOutcome {
            id,
            confirmations: 1,
            required,
            activated,
        })
    }

    /// Confirm a request. The confirmation that brings the request to quorum
    /// applies it; if applying fails the confirmation is withdrawn.
    pub fn confirm_pause(&self, caller: &Principal, id: ProposalId) -> Result<RequestOutcome, PauseError> {
        self.ctx.access.require_role(Role::Guardian, caller)?;
        let now = self.ctx.clock.now();
        let mut guard = self.write()?;
        let state = &mut *guard;
        let required = state.required_confirmations;
        let policy = self.policy(required)?;

        let proposal = state.book.get_mut(id)?;
        proposal.confirm(caller, &policy, now)?;
        let confirmations = proposal.confirmation_count(|p| self.is_guardian(p));

        let mut events = vec![CustodyEvent::PauseConfirmed {
            id: id.0,
            guardian: caller.clone(),
            confirmations,
        }];
        let activated = confirmations >= required;
        if activated {
            match self.activate(state, id, caller, now) {
                Ok(mut applied) => events.append(&mut applied),
                Err(e) => {
                    if let Err(undo) = state
                        .book
                        .get_mut(id)
                        .map_err(PauseError::from)
                        .and_then(|p| p.revoke(caller, &policy, now).map_err(PauseError::from))
                    {
                        error!(id = %id, guardian = %caller, error = %undo, "Failed to withdraw confirmation");
                    }
                    return Err(e);
                }
            }
        }

        info!(id = %id, guardian = %caller, confirmations, required, activated, "Pause request confirmed");
        for event in events {
            self.emit(event);
        }
        Ok(RequestOutcome {
            id,
            confirmations,
            required,
            activated,
        })
    }

    /// Apply a request that reached quorum. All-or-nothing across targets:
    /// switches already flipped are flipped back on the first failure.
    fn activate(
        &self,
        state: &mut ControllerState,
        id: ProposalId,
        by: &Principal,
        now: DateTime<Utc>,
    ) -> Result<Vec<CustodyEvent>, PauseError> {
        let proposal = state.book.get(id)?;
        let action = proposal.action.clone();
        let requested_at = proposal.created_at;
        let expires_at = requested_at + self.config.max_pause_duration();

        // Targets may have changed state since the request was opened.
        Self::validate_targets(state, action.kind, &action.targets, now)?;
        if action.kind == PauseKind::Unpause {
            if let Some(target) = action
                .targets
                .iter()
                .find(|t| state.active_at(t, now).is_some_and(|a| a.since > requested_at))
            {
                return Err(PauseError::StaleRequest {
                    id,
                    component: target.clone(),
                });
            }
        }

        let components = action
            .targets
            .iter()
            .map(|t| {
                state
                    .components
                    .get(t)
                    .cloned()
                    .map(|c| (t.clone(), c))
                    .ok_or_else(|| PauseError::ComponentNotTracked(t.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut events = Vec::new();
        match action.kind {
            PauseKind::Pause => {
                let mut engaged: Vec<&(ComponentId, Arc<dyn Pausable>)> = Vec::new();
                for entry in &components {
                    let (target, component) = entry;
                    if let Err(source) = component.pause(&self.authority, Some(expires_at)) {
                        warn!(id = %id, component = %target, error = %source, "Pause activation failed, rolling back");
                        for (flipped, c) in engaged {
                            if let Err(e) = c.unpause(&self.authority) {
                                error!(component = %flipped, error = %e, "Rollback unpause failed");
                            }
                        }
                        return Err(PauseError::SwitchFailed {
                            component: target.clone(),
                            source,
                        });
                    }
                    engaged.push(entry);
                }

                for (target, _) in &components {
                    state.active.insert(
                        target.clone(),
                        ActivePause {
                            request: id,
                            since: now,
                            until: expires_at,
                        },
                    );
                    state.record(target, Some(id), HistoryAction::Paused { until: expires_at }, now);
                }
                warn!(id = %id, targets = components.len(), expires_at = %expires_at, "Emergency pause activated");
                events.push(CustodyEvent::PauseActivated {
                    id: id.0,
                    targets: action.targets.clone(),
                    expires_at,
                });
            }
            PauseKind::Unpause => {
                let mut lifted: Vec<&(ComponentId, Arc<dyn Pausable>)> = Vec::new();
                for entry in &components {
                    let (target, component) = entry;
                    if let Err(source) = component.unpause(&self.authority) {
                        warn!(id = %id, component = %target, error = %source, "Unpause failed, rolling back");
                        for (flipped, c) in lifted {
                            let until = state.active.get(flipped).map(|a| a.until);
                            if let Err(e) = c.pause(&self.authority, until) {
                                error!(component = %flipped, error = %e, "Rollback pause failed");
                            }
                        }
                        return Err(PauseError::SwitchFailed {
                            component: target.clone(),
                            source,
                        });
                    }
                    lifted.push(entry);
                }

                for (target, _) in &components {
                    state.active.remove(target);
                    state.record(target, Some(id), HistoryAction::Lifted { by: by.clone() }, now);
                    events.push(CustodyEvent::PauseLifted {
                        target: target.clone(),
                        by: by.clone(),
                    });
                }
                info!(id = %id, targets = components.len(), "Pause lifted by guardian quorum");
            }
        }

        state.book.get_mut(id)?.mark_executed(now);
        Ok(events)
    }

    // --- Lifting and expiry ---

    /// Manager override lifting a pause before it lapses.
    pub fn unpause(&self, caller: &Principal, component: &ComponentId) -> Result<(), PauseError> {
        if let Err(e) = self.ctx.access.require_role(Role::Manager, caller) {
            warn!(caller = %caller, component = %component, "Unpause from non-manager rejected");
            return Err(e.into());
        }
        let now = self.ctx.clock.now();
        let mut state = self.write()?;
        let target = state
            .components
            .get(component)
            .cloned()
            .ok_or_else(|| PauseError::ComponentNotTracked(component.clone()))?;
        let request = state
            .active_at(component, now)
            .map(|a| a.request)
            .ok_or_else(|| PauseError::NotPaused(component.clone()))?;

        target
            .unpause(&self.authority)
            .map_err(|source| PauseError::SwitchFailed {
                component: component.clone(),
                source,
            })?;
        state.active.remove(component);
        state.record(component, Some(request), HistoryAction::Lifted { by: caller.clone() }, now);

        info!(component = %component, by = %caller, "Pause lifted by manager");
        self.emit(CustodyEvent::PauseLifted {
            target: component.clone(),
            by: caller.clone(),
        });
        Ok(())
    }

    /// Clear pauses that reached their expiry. Returns the components
    /// released.
    pub fn expire_pauses(&self) -> Result<Vec<ComponentId>, PauseError> {
        let now = self.ctx.clock.now();
        let mut state = self.write()?;
        let lapsed: Vec<(ComponentId, ActivePause)> = state
            .active
            .iter()
            .filter(|(_, a)| now >= a.until)
            .map(|(c, a)| (c.clone(), *a))
            .collect();

        for (component, pause) in &lapsed {
            state.active.remove(component);
            if let Some(target) = state.components.get(component) {
                // the switch has already lapsed; this only clears it
                if let Err(e) = target.unpause(&self.authority) {
                    warn!(component = %component, error = %e, "Could not clear lapsed pause switch");
                }
            }
            state.record(component, Some(pause.request), HistoryAction::Expired, pause.until);
            info!(component = %component, expired_at = %pause.until, "Pause expired");
            self.emit(CustodyEvent::PauseExpired {
                target: component.clone(),
            });
        }
        Ok(lapsed.into_iter().map(|(c, _)| c).collect())
    }

    /// Change the quorum size. Applies to open requests at their next
    /// confirmation.
    pub fn update_required_confirmations(&self, caller: &Principal, required: usize) -> Result<usize, PauseError> {
        self.ctx.access.require_role(Role::Admin, caller)?;
        let guardians = self.ctx.access.member_count(Role::Guardian);
        if required == 0 || required > guardians {
            return Err(PauseError::InvalidConfirmations {
                requested: required,
                guardians,
            });
        }

        let mut state = self.write()?;
        let previous = state.required_confirmations;
        if previous == required {
            debug!(required, "Required confirmations unchanged");
            return Ok(previous);
        }
        state.required_confirmations = required;

        info!(previous, new = required, by = %caller, "Required confirmations updated");
        self.emit(CustodyEvent::RequiredConfirmationsChanged {
            previous,
            new: required,
        });
        Ok(previous)
    }

    // --- Queries ---

    pub fn component_id(&self) -> &ComponentId {
        &self.id
    }

    pub fn authority(&self) -> &Principal {
        &self.authority
    }

    pub fn required_confirmations(&self) -> usize {
        self.read()
            .map(|s| s.required_confirmations)
            .unwrap_or(self.config.required_confirmations)
    }

    pub fn guardian_count(&self) -> usize {
        self.ctx.access.member_count(Role::Guardian)
    }

    /// Whether the controller holds `component` paused at the current time.
    /// False once the pause's expiry is reached, whether or not
    /// `expire_pauses` has run.
    pub fn is_paused(&self, component: &ComponentId) -> bool {
        let now = self.ctx.clock.now();
        self.read()
            .map(|s| s.active_at(component, now).is_some())
            .unwrap_or(true)
    }

    pub fn paused_until(&self, component: &ComponentId) -> Option<DateTime<Utc>> {
        let now = self.ctx.clock.now();
        self.read()
            .ok()
            .and_then(|s| s.active_at(component, now).map(|a| a.until))
    }

    pub fn tracked_components(&self) -> Vec<ComponentId> {
        self.read()
            .map(|s| s.components.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn component_statuses(&self) -> Vec<ComponentStatus> {
        let now = self.ctx.clock.now();
        let Ok(state) = self.read() else {
            return Vec::new();
        };
        state
            .components
            .keys()
            .map(|c| {
                let active = state.active_at(c, now);
                ComponentStatus {
                    component: c.clone(),
                    paused: active.is_some(),
                    paused_until: active.map(|a| a.until),
                    request: active.map(|a| a.request),
                }
            })
            .collect()
    }

    /// Most recent history entries first.
    pub fn pause_history(&self, limit: usize) -> Vec<PauseHistoryEntry> {
        self.read()
            .map(|s| s.history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    fn view(&self, proposal: &Proposal<PauseAction>, required: usize, now: DateTime<Utc>) -> PauseRequestView {
        let expires_at = proposal.created_at + self.config.max_pause_duration();
        PauseRequestView {
            id: proposal.id,
            kind: proposal.action.kind,
            targets: proposal.action.targets.clone(),
            reason: proposal.action.reason.clone(),
            proposer: proposal.proposer.clone(),
            confirmations: proposal.confirmation_count(|p| self.is_guardian(p)),
            required,
            created_at: proposal.created_at,
            expires_at,
            status: self
                .policy(required)
                .map(|policy| proposal.status_at(&policy, now))
                .unwrap_or_else(|_| proposal.recorded_status()),
        }
    }

    pub fn request(&self, id: ProposalId) -> Result<PauseRequestView, PauseError> {
        let now = self.ctx.clock.now();
        let state = self.read()?;
        let proposal = state.book.get(id)?;
        Ok(self.view(proposal, state.required_confirmations, now))
    }

    /// Requests still collecting confirmations, oldest first.
    pub fn pending_requests(&self) -> Result<Vec<PauseRequestView>, PauseError> {
        let now = self.ctx.clock.now();
        let state = self.read()?;
        let policy = self.policy(state.required_confirmations)?;
        state
            .book
            .pending_ids(&policy, now)
            .into_iter()
            .map(|id| {
                let proposal = state.book.get(id)?;
                Ok(self.view(proposal, state.required_confirmations, now))
            })
            .collect()
    }
}
