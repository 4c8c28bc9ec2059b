use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use custody_roles::CustodyContext;
use custody_types::{
    Amount, ComponentId, CustodyEvent, Pausable, PauseSwitch, Principal, Role, SwitchError,
};
use tracing::{debug, info, warn};

use crate::config::RewardConfig;
use crate::error::{LimitScope, RewardError};
use crate::template::{ClaimRecord, Eligibility, RewardReceipt, RewardSource, RewardTemplate};
use crate::window::DailyWindow;

struct EngineState {
    templates: BTreeMap<String, RewardTemplate>,
    claims: HashMap<(Principal, String), ClaimRecord>,
    template_windows: HashMap<String, DailyWindow>,
    global_window: DailyWindow,
    whitelist: BTreeSet<Principal>,
    /// referee → referrer, set once
    referred_by: HashMap<Principal, Principal>,
    referral_counts: HashMap<Principal, u32>,
    pause: PauseSwitch,
}

/// Outcome of a successful template check: the amount and the windows as
/// they will read once the claim is committed.
struct Admission {
    amount: Amount,
    template_window: Option<DailyWindow>,
    global_window: DailyWindow,
}

/// Reward distribution engine paying out of its own ledger account.
pub struct RewardDistributionEngine {
    id: ComponentId,
    account: Principal,
    daily_global_limit: Amount,
    max_custom_reward: Amount,
    referral_bonus: Amount,
    treasury: Option<Principal>,
    state: RwLock<EngineState>,
    ctx: CustodyContext,
}

fn check_principal(principal: &Principal) -> Result<(), RewardError> {
    if principal.is_empty() {
        return Err(RewardError::InvalidPrincipal(principal.clone()));
    }
    Ok(())
}

impl RewardDistributionEngine {
    pub fn new(config: RewardConfig, account: Principal, ctx: CustodyContext) -> Result<Self, RewardError> {
        check_principal(&account)?;
        let now = ctx.clock.now();

        let mut templates = BTreeMap::new();
        for template in config.templates {
            if template.id.trim().is_empty() {
                return Err(RewardError::InvalidTemplate("empty template id".into()));
            }
            if !template.has_valid_cooldown() {
                return Err(RewardError::InvalidTemplate(format!(
                    "cooldown out of range for {}",
                    template.id
                )));
            }
            if templates.contains_key(&template.id) {
                return Err(RewardError::InvalidTemplate(format!(
                    "duplicate template id {}",
                    template.id
                )));
            }
            templates.insert(template.id.clone(), template);
        }

        info!(
            account = %account,
            templates = templates.len(),
            daily_global_limit = config.daily_global_limit,
            "Reward engine initialized"
        );

        Ok(Self {
            id: ComponentId::new(config.component_id),
            account,
            daily_global_limit: config.daily_global_limit,
            max_custom_reward: config.max_custom_reward,
            referral_bonus: config.referral_bonus,
            treasury: config.treasury,
            state: RwLock::new(EngineState {
                templates,
                claims: HashMap::new(),
                template_windows: HashMap::new(),
                global_window: DailyWindow::new(now),
                whitelist: BTreeSet::new(),
                referred_by: HashMap::new(),
                referral_counts: HashMap::new(),
                pause: PauseSwitch::new(),
            }),
            ctx,
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, EngineState>, RewardError> {
        self.state.write().map_err(|_| RewardError::LockError)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, EngineState>, RewardError> {
        self.state.read().map_err(|_| RewardError::LockError)
    }

    fn emit(&self, event: CustodyEvent) {
        self.ctx.emit(&self.id, event);
    }

    fn ensure_running(state: &EngineState, now: DateTime<Utc>) -> Result<(), RewardError> {
        if state.pause.is_engaged(now) {
            return Err(RewardError::Paused);
        }
        Ok(())
    }

    fn admit_global(&self, state: &EngineState, now: DateTime<Utc>, amount: Amount) -> Result<DailyWindow, RewardError> {
        state
            .global_window
            .admit(now, amount, self.daily_global_limit)
            .map_err(|remaining| RewardError::DailyLimitExceeded {
                scope: LimitScope::Global,
                requested: amount,
                remaining,
            })
    }

    fn ensure_funded(&self, amount: Amount) -> Result<(), RewardError> {
        let available = self.ctx.ledger.balance_of(&self.account);
        if available < amount {
            return Err(RewardError::InsufficientTreasuryBalance {
                required: amount,
                available,
            });
        }
        Ok(())
    }

    /// Every check a template claim must pass, in order. Pure with respect
    /// to engine state.
    fn evaluate(
        &self,
        state: &EngineState,
        template_id: &str,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<Admission, RewardError> {
        Self::ensure_running(state, now)?;

        let template = state
            .templates
            .get(template_id)
            .ok_or_else(|| RewardError::TemplateNotFound(template_id.to_string()))?;
        if !template.active {
            return Err(RewardError::TemplateInactive(template.id.clone()));
        }
        if template.is_custom() {
            return Err(RewardError::CustomAmountTemplate(template.id.clone()));
        }
        if template.requires_whitelist && !state.whitelist.contains(principal) {
            return Err(RewardError::NotWhitelisted(principal.clone()));
        }

        if let Some(record) = state.claims.get(&(principal.clone(), template.id.clone())) {
            if template.max_claims_per_principal > 0
                && record.claims >= template.max_claims_per_principal
            {
                return Err(RewardError::AlreadyClaimed {
                    template: template.id.clone(),
                    principal: principal.clone(),
                });
            }
            if let Some(available_at) = template.available_after(record.last_claimed_at) {
                if now < available_at {
                    return Err(RewardError::CooldownActive {
                        template: template.id.clone(),
                        available_at,
                    });
                }
            }
        }

        let amount = template.fixed_amount;
        let template_window = match template.daily_limit {
            Some(limit) => {
                let window = state
                    .template_windows
                    .get(&template.id)
                    .copied()
                    .unwrap_or_else(|| DailyWindow::new(now));
                Some(window.admit(now, amount, limit).map_err(|remaining| {
                    RewardError::DailyLimitExceeded {
                        scope: LimitScope::Template(template.id.clone()),
                        requested: amount,
                        remaining,
                    }
                })?)
            }
            None => None,
        };
        let global_window = self.admit_global(state, now, amount)?;
        self.ensure_funded(amount)?;

        Ok(Admission {
            amount,
            template_window,
            global_window,
        })
    }

    // --- Issuance ---

    /// Claim a fixed-amount template for `principal`.
    pub fn claim(&self, template_id: &str, principal: &Principal) -> Result<RewardReceipt, RewardError> {
        check_principal(principal)?;
        let now = self.ctx.clock.now();
        let mut state = self.write()?;

        let admission = match self.evaluate(&state, template_id, principal, now) {
            Ok(admission) => admission,
            Err(e) => {
                debug!(template = template_id, principal = %principal, error = %e, "Claim rejected");
                return Err(e);
            }
        };
        self.ctx
            .ledger
            .transfer(&self.account, principal, admission.amount)?;

        if let Some(window) = admission.template_window {
            state.template_windows.insert(template_id.to_string(), window);
        }
        state.global_window = admission.global_window;
        state
            .claims
            .entry((principal.clone(), template_id.to_string()))
            .and_modify(|record| record.record(now))
            .or_insert_with(|| ClaimRecord::first(now));
        let issued_today = admission.global_window.issued_at(now);

        info!(
            template = template_id,
            principal = %principal,
            amount = admission.amount,
            issued_today,
            "Reward claimed"
        );
        self.emit(CustodyEvent::RewardClaimed {
            template: template_id.to_string(),
            principal: principal.clone(),
            amount: admission.amount,
            issued_today,
        });

        Ok(RewardReceipt {
            source: RewardSource::Template {
                template: template_id.to_string(),
            },
            recipient: principal.clone(),
            amount: admission.amount,
            issued_at: now,
            issued_today,
        })
    }

    /// Whether `principal` could claim `template_id` now, and if not why.
    pub fn can_claim(&self, principal: &Principal, template_id: &str) -> Eligibility {
        let now = self.ctx.clock.now();
        let state = match self.read() {
            Ok(state) => state,
            Err(e) => return Eligibility::ineligible(e.to_string()),
        };
        match self.evaluate(&state, template_id, principal, now) {
            Ok(admission) => Eligibility::eligible(admission.amount),
            Err(e) => Eligibility::ineligible(e.to_string()),
        }
    }

    /// Backend-authorized off-template grant. Subject to the global limit.
    pub fn issue_custom_reward(
        &self,
        caller: &Principal,
        principal: &Principal,
        amount: Amount,
        reason: impl Into<String>,
    ) -> Result<RewardReceipt, RewardError> {
        if let Err(e) = self.ctx.access.require_role(Role::Backend, caller) {
            warn!(caller = %caller, "Custom reward from unauthorized backend");
            return Err(e.into());
        }
        check_principal(principal)?;
        if amount == 0 || amount > self.max_custom_reward {
            return Err(RewardError::InvalidAmount {
                amount,
                max: self.max_custom_reward,
            });
        }
        let reason = reason.into();

        let now = self.ctx.clock.now();
        let mut state = self.write()?;
        Self::ensure_running(&state, now)?;
        let global_window = self.admit_global(&state, now, amount)?;
        self.ctx.ledger.transfer(&self.account, principal, amount)?;
        state.global_window = global_window;
        let issued_today = global_window.issued_at(now);

        info!(principal = %principal, amount, by = %caller, reason = %reason, "Custom reward issued");
        self.emit(CustodyEvent::CustomRewardIssued {
            principal: principal.clone(),
            amount,
            reason: reason.clone(),
            by: caller.clone(),
        });

        Ok(RewardReceipt {
            source: RewardSource::Custom {
                reason,
                issued_by: caller.clone(),
            },
            recipient: principal.clone(),
            amount,
            issued_at: now,
            issued_today,
        })
    }

    /// Record that `referee` was referred by `referrer` and pay the referrer
    /// the referral bonus. Each referee can be referred once.
    pub fn claim_referral_bonus(&self, referee: &Principal, referrer: &Principal) -> Result<RewardReceipt, RewardError> {
        check_principal(referee)?;
        check_principal(referrer)?;
        if referee == referrer {
            return Err(RewardError::SelfReferral);
        }

        let now = self.ctx.clock.now();
        let mut state = self.write()?;
        Self::ensure_running(&state, now)?;
        if state.referred_by.contains_key(referee) {
            return Err(RewardError::AlreadyReferred(referee.clone()));
        }
        let amount = self.referral_bonus;
        let global_window = self.admit_global(&state, now, amount)?;
        self.ctx.ledger.transfer(&self.account, referrer, amount)?;

        state.global_window = global_window;
        state.referred_by.insert(referee.clone(), referrer.clone());
        *state.referral_counts.entry(referrer.clone()).or_insert(0) += 1;
        let issued_today = global_window.issued_at(now);

        info!(referee = %referee, referrer = %referrer, amount, "Referral rewarded");
        self.emit(CustodyEvent::ReferralRewarded {
            referee: referee.clone(),
            referrer: referrer.clone(),
            amount,
        });

        Ok(RewardReceipt {
            source: RewardSource::Referral {
                referee: referee.clone(),
            },
            recipient: referrer.clone(),
            amount,
            issued_at: now,
            issued_today,
        })
    }

    // --- Administration ---

    /// Grant or revoke the backend role. Goes through the role registry, so
    /// the caller needs the backend role's administering role.
    pub fn set_authorized_backend(
        &self,
        caller: &Principal,
        backend: &Principal,
        enabled: bool,
    ) -> Result<bool, RewardError> {
        let changed = if enabled {
            self.ctx.access.grant_role(caller, Role::Backend, backend)?
        } else {
            self.ctx.access.revoke_role(caller, Role::Backend, backend)?
        };
        info!(backend = %backend, enabled, changed, "Backend authorization updated");
        Ok(changed)
    }

    /// Create or replace a template. Returns the previous definition.
    pub fn upsert_template(
        &self,
        caller: &Principal,
        template: RewardTemplate,
    ) -> Result<Option<RewardTemplate>, RewardError> {
        self.ctx.access.require_role(Role::Manager, caller)?;
        if template.id.trim().is_empty() {
            return Err(RewardError::InvalidTemplate("empty template id".into()));
        }
        if !template.has_valid_cooldown() {
            return Err(RewardError::InvalidTemplate(format!(
                "cooldown out of range for {}",
                template.id
            )));
        }

        let mut state = self.write()?;
        let new_amount = template.fixed_amount;
        let active = template.active;
        let id = template.id.clone();
        let previous = state.templates.insert(id.clone(), template);

        info!(template = %id, amount = new_amount, active, "Template upserted");
        self.emit(CustodyEvent::TemplateUpserted {
            template: id,
            previous_amount: previous.as_ref().map(|t| t.fixed_amount),
            new_amount,
            active,
        });
        Ok(previous)
    }

    pub fn set_template_active(&self, caller: &Principal, template_id: &str, active: bool) -> Result<bool, RewardError> {
        self.ctx.access.require_role(Role::Manager, caller)?;
        let mut state = self.write()?;
        let template = state
            .templates
            .get_mut(template_id)
            .ok_or_else(|| RewardError::TemplateNotFound(template_id.to_string()))?;
        if template.active == active {
            return Ok(false);
        }
        let previous = template.active;
        template.active = active;

        info!(template = template_id, active, "Template activation changed");
        self.emit(CustodyEvent::TemplateActivation {
            template: template_id.to_string(),
            previous,
            new: active,
        });
        Ok(true)
    }

    /// Whitelist every principal in `principals`. All-or-nothing on input
    /// validation. Returns the number newly added.
    pub fn add_to_whitelist(&self, caller: &Principal, principals: &[Principal]) -> Result<usize, RewardError> {
        self.ctx.access.require_role(Role::Manager, caller)?;
        principals.iter().try_for_each(check_principal)?;

        let mut state = self.write()?;
        let mut added = 0;
        for principal in principals {
            if state.whitelist.insert(principal.clone()) {
                added += 1;
                self.emit(CustodyEvent::WhitelistChanged {
                    principal: principal.clone(),
                    whitelisted: true,
                });
            }
        }
        info!(requested = principals.len(), added, "Whitelist updated");
        Ok(added)
    }

    pub fn remove_from_whitelist(&self, caller: &Principal, principal: &Principal) -> Result<bool, RewardError> {
        self.ctx.access.require_role(Role::Manager, caller)?;
        let mut state = self.write()?;
        if !state.whitelist.remove(principal) {
            return Ok(false);
        }
        warn!(principal = %principal, "Removed from whitelist");
        self.emit(CustodyEvent::WhitelistChanged {
            principal: principal.clone(),
            whitelisted: false,
        });
        Ok(true)
    }

    // --- Withdrawals ---

    /// Move distributor funds out. Only the configured treasury may sweep.
    pub fn treasury_sweep(&self, caller: &Principal, recipient: &Principal, amount: Amount) -> Result<(), RewardError> {
        if self.treasury.as_ref() != Some(caller) {
            warn!(caller = %caller, "Sweep attempted by non-treasury principal");
            return Err(RewardError::NotTreasury(caller.clone()));
        }
        check_principal(recipient)?;
        if amount == 0 {
            return Err(RewardError::InvalidAmount {
                amount,
                max: self.balance(),
            });
        }

        let _serialized = self.write()?;
        self.ctx.ledger.transfer(&self.account, recipient, amount)?;

        info!(recipient = %recipient, amount, "Distributor balance swept");
        self.emit(CustodyEvent::TreasurySwept {
            recipient: recipient.clone(),
            amount,
        });
        Ok(())
    }

    /// Manager-gated withdrawal, available only while the engine is paused.
    pub fn emergency_withdraw(&self, caller: &Principal, recipient: &Principal, amount: Amount) -> Result<(), RewardError> {
        self.ctx.access.require_role(Role::Manager, caller)?;
        check_principal(recipient)?;
        if amount == 0 {
            return Err(RewardError::InvalidAmount {
                amount,
                max: self.balance(),
            });
        }

        let now = self.ctx.clock.now();
        let state = self.write()?;
        if !state.pause.is_engaged(now) {
            return Err(RewardError::NotPaused);
        }
        self.ctx.ledger.transfer(&self.account, recipient, amount)?;

        warn!(recipient = %recipient, amount, by = %caller, "Reward engine emergency withdrawal");
        self.emit(CustodyEvent::EmergencyWithdrawal {
            recipient: recipient.clone(),
            amount,
        });
        Ok(())
    }

    // --- Queries ---

    pub fn component_id(&self) -> &ComponentId {
        &self.id
    }

    pub fn account(&self) -> &Principal {
        &self.account
    }

    pub fn balance(&self) -> Amount {
        self.ctx.ledger.balance_of(&self.account)
    }

    pub fn daily_global_limit(&self) -> Amount {
        self.daily_global_limit
    }

    pub fn template(&self, template_id: &str) -> Option<RewardTemplate> {
        self.read()
            .ok()
            .and_then(|s| s.templates.get(template_id).cloned())
    }

    pub fn templates(&self) -> Vec<RewardTemplate> {
        self.read()
            .map(|s| s.templates.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_whitelisted(&self, principal: &Principal) -> bool {
        self.read()
            .map(|s| s.whitelist.contains(principal))
            .unwrap_or(false)
    }

    pub fn claim_record(&self, principal: &Principal, template_id: &str) -> Option<ClaimRecord> {
        self.read().ok().and_then(|s| {
            s.claims
                .get(&(principal.clone(), template_id.to_string()))
                .cloned()
        })
    }

    pub fn referrer_of(&self, referee: &Principal) -> Option<Principal> {
        self.read()
            .ok()
            .and_then(|s| s.referred_by.get(referee).cloned())
    }

    pub fn referral_count(&self, referrer: &Principal) -> u32 {
        self.read()
            .map(|s| s.referral_counts.get(referrer).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Amount issued so far on the current UTC day.
    pub fn issued_today(&self) -> Amount {
        let now = self.ctx.clock.now();
        self.read()
            .map(|s| s.global_window.issued_at(now))
            .unwrap_or(0)
    }

    /// Global headroom left on the current UTC day.
    pub fn remaining_daily_limit(&self) -> Amount {
        let now = self.ctx.clock.now();
        self.read()
            .map(|s| s.global_window.headroom(now, self.daily_global_limit))
            .unwrap_or(0)
    }

    /// Headroom left on a template's own daily limit; `None` when the
    /// template has no limit of its own.
    pub fn remaining_template_limit(&self, template_id: &str) -> Result<Option<Amount>, RewardError> {
        let now = self.ctx.clock.now();
        let state = self.read()?;
        let template = state
            .templates
            .get(template_id)
            .ok_or_else(|| RewardError::TemplateNotFound(template_id.to_string()))?;
        Ok(template.daily_limit.map(|limit| {
            state
                .template_windows
                .get(template_id)
                .map_or(limit, |w| w.headroom(now, limit))
        }))
    }

    pub fn is_paused(&self) -> bool {
        let now = self.ctx.clock.now();
        self.read().map(|s| s.pause.is_engaged(now)).unwrap_or(true)
    }
}

impl Pausable for RewardDistributionEngine {
    fn component_id(&self) -> ComponentId {
        self.id.clone()
    }

    fn pause(&self, caller: &Principal, until: Option<DateTime<Utc>>) -> Result<(), SwitchError> {
        if !self.ctx.access.has_role(Role::Pauser, caller) {
            warn!(caller = %caller, component = %self.id, "Rejected pause from non-pauser");
            return Err(SwitchError::Unauthorized(caller.clone()));
        }
        let now = self.ctx.clock.now();
        let mut state = self
            .state
            .write()
            .map_err(|_| SwitchError::Unavailable("reward engine state lock poisoned".into()))?;
        state.pause.engage(caller.clone(), now, until);

        warn!(component = %self.id, by = %caller, until = ?until, "Reward engine paused");
        self.emit(CustodyEvent::Paused {
            by: caller.clone(),
            until,
        });
        Ok(())
    }

    fn unpause(&self, caller: &Principal) -> Result<(), SwitchError> {
        if !self.ctx.access.has_role(Role::Pauser, caller) {
            return Err(SwitchError::Unauthorized(caller.clone()));
        }
        let now = self.ctx.clock.now();
        let mut state = self
            .state
            .write()
            .map_err(|_| SwitchError::Unavailable("reward engine state lock poisoned".into()))?;
        if state.pause.release(caller, now) {
            info!(component = %self.id, by = %caller, "Reward engine unpaused");
            self.emit(CustodyEvent::Unpaused { by: caller.clone() });
        } else {
            debug!(component = %self.id, by = %caller, "No engagement held by caller");
        }
        Ok(())
    }

    fn is_paused(&self) -> bool {
        RewardDistributionEngine::is_paused(self)
    }
}
