use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use custody_quorum::{Proposal, ProposalBook, ProposalId, ProposalStatus, QuorumPolicy};
use custody_roles::CustodyContext;
use custody_types::{
    Amount, ComponentId, CustodyEvent, Pausable, PauseSwitch, Principal, Role, SwitchError,
};
use tracing::{debug, error, info, warn};

use crate::config::TreasuryConfig;
use crate::dispatch::{CallDispatcher, NoopDispatcher, OutboundCall};
use crate::error::TreasuryError;
use crate::types::{EmergencyWithdrawal, Page, PendingAction, TransactionView, TreasuryAction};

pub(crate) struct TreasuryState {
    /// Insertion-ordered, duplicate-free.
    pub(crate) signers: Vec<Principal>,
    pub(crate) threshold: usize,
    pub(crate) book: ProposalBook<PendingAction>,
    pub(crate) pause: PauseSwitch,
    /// Open emergency withdrawal round, if any.
    pub(crate) emergency: Option<Proposal<EmergencyWithdrawal>>,
    pub(crate) emergency_rounds: u64,
}

impl TreasuryState {
    pub(crate) fn is_signer(&self, principal: &Principal) -> bool {
        self.signers.contains(principal)
    }

    pub(crate) fn signer_set(&self) -> BTreeSet<Principal> {
        self.signers.iter().cloned().collect()
    }
}

/// Multi-signer treasury holding funds in its own ledger account.
///
/// All mutable state sits behind one lock; every operation validates, moves
/// value and updates state inside a single write critical section.
pub struct MultisigTreasury {
    pub(crate) id: ComponentId,
    pub(crate) account: Principal,
    pub(crate) config: TreasuryConfig,
    pub(crate) state: RwLock<TreasuryState>,
    pub(crate) ctx: CustodyContext,
    dispatcher: Arc<dyn CallDispatcher>,
}

impl MultisigTreasury {
    pub fn new(
        config: TreasuryConfig,
        account: Principal,
        signers: Vec<Principal>,
        threshold: usize,
        ctx: CustodyContext,
    ) -> Result<Self, TreasuryError> {
        if account.is_empty() {
            return Err(TreasuryError::InvalidPrincipal(account));
        }
        if config.execution_delay_secs >= config.expiry_secs {
            return Err(TreasuryError::InvalidConfig(format!(
                "execution delay {}s must be shorter than expiry {}s",
                config.execution_delay_secs, config.expiry_secs
            )));
        }
        if config.emergency_max_share_bps > 10_000 {
            return Err(TreasuryError::InvalidConfig(format!(
                "emergency share {} bps exceeds 100%",
                config.emergency_max_share_bps
            )));
        }
        if signers.is_empty() {
            return Err(TreasuryError::NoSigners);
        }
        if signers.len() > config.max_signers {
            return Err(TreasuryError::TooManySigners {
                max: config.max_signers,
            });
        }
        let mut seen = BTreeSet::new();
        for signer in &signers {
            if signer.is_empty() {
                return Err(TreasuryError::InvalidPrincipal(signer.clone()));
            }
            if !seen.insert(signer) {
                return Err(TreasuryError::DuplicateSigner(signer.clone()));
            }
        }
        if threshold == 0 || threshold > signers.len() {
            return Err(TreasuryError::InvalidThreshold {
                threshold,
                signers: signers.len(),
            });
        }

        info!(
            account = %account,
            signers = signers.len(),
            threshold,
            "Multisig treasury initialized"
        );

        Ok(Self {
            id: ComponentId::new(config.component_id.clone()),
            account,
            config,
            state: RwLock::new(TreasuryState {
                signers,
                threshold,
                book: ProposalBook::new(),
                pause: PauseSwitch::new(),
                emergency: None,
                emergency_rounds: 0,
            }),
            ctx,
            dispatcher: Arc::new(NoopDispatcher),
        })
    }

    /// Replace the call dispatcher used for non-empty payloads.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn CallDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, TreasuryState>, TreasuryError> {
        self.state.write().map_err(|_| TreasuryError::LockError)
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, TreasuryState>, TreasuryError> {
        self.state.read().map_err(|_| TreasuryError::LockError)
    }

    pub(crate) fn policy(&self, threshold: usize) -> Result<QuorumPolicy, TreasuryError> {
        Ok(QuorumPolicy::new(
            threshold,
            self.config.execution_delay(),
            self.config.expiry(),
        )?)
    }

    pub(crate) fn require_signer(state: &TreasuryState, caller: &Principal) -> Result<(), TreasuryError> {
        if state.is_signer(caller) {
            Ok(())
        } else {
            warn!(caller = %caller, "Rejected treasury call from non-signer");
            Err(TreasuryError::NotSigner(caller.clone()))
        }
    }

    pub(crate) fn emit(&self, event: CustodyEvent) {
        self.ctx.emit(&self.id, event);
    }

    // --- Proposal lifecycle ---

    /// Propose an outbound transfer. The proposer's confirmation is recorded.
    pub fn propose_transaction(
        &self,
        caller: &Principal,
        target: Principal,
        value: Amount,
        payload: Vec<u8>,
        description: impl Into<String>,
    ) -> Result<ProposalId, TreasuryError> {
        self.propose_action(
            caller,
            TreasuryAction::Transfer {
                target,
                value,
                payload,
            },
            description,
        )
    }

    /// Propose any treasury action, including self-governance actions.
    pub fn propose_action(
        &self,
        caller: &Principal,
        action: TreasuryAction,
        description: impl Into<String>,
    ) -> Result<ProposalId, TreasuryError> {
        match &action {
            TreasuryAction::Transfer { target, .. } if target.is_empty() => {
                return Err(TreasuryError::InvalidPrincipal(target.clone()));
            }
            TreasuryAction::AddSigner { signer } | TreasuryAction::RemoveSigner { signer }
                if signer.is_empty() =>
            {
                return Err(TreasuryError::InvalidPrincipal(signer.clone()));
            }
            _ => {}
        }

        let now = self.ctx.clock.now();
        let mut state = self.write()?;
        Self::require_signer(&state, caller)?;
        if state.pause.is_engaged(now) && !action.allowed_while_paused() {
            return Err(TreasuryError::Paused);
        }

        let summary = action.summary();
        let id = state.book.open(
            caller.clone(),
            PendingAction {
                action,
                description: description.into(),
            },
            now,
        );

        info!(id = %id, proposer = %caller, summary = %summary, "Transaction proposed");
        self.emit(CustodyEvent::TransactionProposed {
            id: id.0,
            proposer: caller.clone(),
            summary,
        });
        Ok(id)
    }

    fn confirm_locked(
        &self,
        state: &mut TreasuryState,
        caller: &Principal,
        id: ProposalId,
        now: DateTime<Utc>,
    ) -> Result<usize, TreasuryError> {
        let policy = self.policy(state.threshold)?;
        let paused = state.pause.is_engaged(now);
        let signers = state.signer_set();

        let proposal = state.book.get_mut(id)?;
        if paused && !proposal.action.action.allowed_while_paused() {
            return Err(TreasuryError::Paused);
        }
        proposal.confirm(caller, &policy, now)?;
        let confirmations = proposal.confirmation_count(|p| signers.contains(p));

        info!(id = %id, signer = %caller, confirmations, "Transaction confirmed");
        self.emit(CustodyEvent::TransactionConfirmed {
            id: id.0,
            signer: caller.clone(),
            confirmations,
        });
        Ok(confirmations)
    }

    /// Confirm a pending transaction. Returns the number of confirmations
    /// from current signers.
    pub fn confirm_transaction(&self, caller: &Principal, id: ProposalId) -> Result<usize, TreasuryError> {
        let now = self.ctx.clock.now();
        let mut state = self.write()?;
        Self::require_signer(&state, caller)?;
        self.confirm_locked(&mut state, caller, id, now)
    }

    /// Confirm several transactions, skipping ids that cannot be confirmed.
    /// Returns the ids that were confirmed.
    pub fn batch_confirm(&self, caller: &Principal, ids: &[ProposalId]) -> Result<Vec<ProposalId>, TreasuryError> {
        self.check_batch(ids)?;
        let now = self.ctx.clock.now();
        let mut state = self.write()?;
        Self::require_signer(&state, caller)?;

        let mut confirmed = Vec::new();
        for id in ids {
            match self.confirm_locked(&mut state, caller, *id, now) {
                Ok(_) => confirmed.push(*id),
                Err(e) => debug!(id = %id, error = %e, "Skipping transaction in batch confirm"),
            }
        }
        Ok(confirmed)
    }

    /// Withdraw the caller's confirmation from a pending transaction.
    pub fn revoke_confirmation(&self, caller: &Principal, id: ProposalId) -> Result<usize, TreasuryError> {
        let now = self.ctx.clock.now();
        let mut guard = self.write()?;
        let state = &mut *guard;
        Self::require_signer(state, caller)?;
        let policy = self.policy(state.threshold)?;

        let proposal = state.book.get_mut(id)?;
        proposal.revoke(caller, &policy, now)?;
        let confirmations = proposal.confirmation_count(|p| state.signers.contains(p));

        warn!(id = %id, signer = %caller, confirmations, "Confirmation revoked");
        self.emit(CustodyEvent::ConfirmationRevoked {
            id: id.0,
            signer: caller.clone(),
            confirmations,
        });
        Ok(confirmations)
    }

    /// Execute a transaction that holds quorum inside its execution window.
    ///
    /// Effects are all-or-nothing: if the action fails (insufficient balance,
    /// signer-set invariant, dispatch failure) the transaction stays pending.
    /// The one exception is a failed call whose transfer cannot be reverted:
    /// the value has left the treasury, so the transaction is closed as
    /// `Failed` and can never pay out again.
    pub fn execute_transaction(&self, caller: &Principal, id: ProposalId) -> Result<(), TreasuryError> {
        let now = self.ctx.clock.now();
        let mut guard = self.write()?;
        let state = &mut *guard;
        Self::require_signer(state, caller)?;
        let policy = self.policy(state.threshold)?;
        let paused = state.pause.is_engaged(now);

        let proposal = state.book.get_mut(id)?;
        let signers = &state.signers;
        proposal.ensure_executable(&policy, now, |p| signers.contains(p))?;
        if paused && !proposal.action.action.allowed_while_paused() {
            return Err(TreasuryError::Paused);
        }
        let action = proposal.action.action.clone();

        if let Err(e) = self.apply(state, id, &action, now) {
            if let TreasuryError::RollbackFailed { reason, .. } = &e {
                state.book.get_mut(id)?.mark_failed(now);
                error!(id = %id, executor = %caller, "Transaction closed as failed");
                self.emit(CustodyEvent::TransactionFailed {
                    id: id.0,
                    reason: reason.clone(),
                });
            }
            return Err(e);
        }

        state.book.get_mut(id)?.mark_executed(now);
        info!(id = %id, executor = %caller, "Transaction executed");
        self.emit(CustodyEvent::TransactionExecuted {
            id: id.0,
            executor: caller.clone(),
        });
        Ok(())
    }

    fn apply(
        &self,
        state: &mut TreasuryState,
        id: ProposalId,
        action: &TreasuryAction,
        now: DateTime<Utc>,
    ) -> Result<(), TreasuryError> {
        match action {
            TreasuryAction::Transfer {
                target,
                value,
                payload,
            } => self.perform_transfer(id, target, *value, payload),
            TreasuryAction::AddSigner { signer } => self.insert_signer(state, signer),
            TreasuryAction::RemoveSigner { signer } => self.remove_signer_locked(state, signer),
            TreasuryAction::ChangeThreshold { threshold } => {
                self.change_threshold_locked(state, *threshold)
            }
            TreasuryAction::Pause => {
                state.pause.engage(self.account.clone(), now, None);
                info!(component = %self.id, "Treasury paused by multisig");
                self.emit(CustodyEvent::Paused {
                    by: self.account.clone(),
                    until: None,
                });
                Ok(())
            }
            TreasuryAction::Unpause => {
                if state.pause.release(&self.account, now) {
                    info!(component = %self.id, "Treasury unpaused by multisig");
                    self.emit(CustodyEvent::Unpaused {
                        by: self.account.clone(),
                    });
                }
                Ok(())
            }
        }
    }

    fn perform_transfer(
        &self,
        id: ProposalId,
        target: &Principal,
        value: Amount,
        payload: &[u8],
    ) -> Result<(), TreasuryError> {
        let call = OutboundCall {
            target,
            value,
            payload,
        };
        if !payload.is_empty() {
            let estimated = self.dispatcher.estimate(&call);
            if estimated > self.config.max_gas_limit {
                warn!(id = %id, estimated, limit = self.config.max_gas_limit, "Call exceeds resource ceiling");
                return Err(TreasuryError::ResourceExceeded {
                    estimated,
                    limit: self.config.max_gas_limit,
                });
            }
        }

        if value > 0 {
            self.ctx.ledger.transfer(&self.account, target, value)?;
        }

        if !payload.is_empty() {
            if let Err(e) = self.dispatcher.dispatch(&call) {
                if value > 0 {
                    if let Err(rollback) = self.ctx.ledger.transfer(target, &self.account, value) {
                        error!(id = %id, error = %rollback, "Failed to roll back transfer after call failure");
                        return Err(TreasuryError::RollbackFailed {
                            id,
                            reason: format!("{e}; rollback: {rollback}"),
                        });
                    }
                }
                warn!(id = %id, error = %e, "Transaction call failed");
                return Err(TreasuryError::CallFailed {
                    id,
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }

    // --- Expired transactions ---

    /// Mark an expired transaction as cancelled.
    pub fn cancel_expired(&self, caller: &Principal, id: ProposalId) -> Result<(), TreasuryError> {
        let now = self.ctx.clock.now();
        let mut state = self.write()?;
        Self::require_signer(&state, caller)?;
        self.cancel_locked(&mut state, id, now)
    }

    /// Cancel several expired transactions, skipping the rest.
    pub fn cancel_expired_batch(
        &self,
        caller: &Principal,
        ids: &[ProposalId],
    ) -> Result<Vec<ProposalId>, TreasuryError> {
        self.check_batch(ids)?;
        let now = self.ctx.clock.now();
        let mut state = self.write()?;
        Self::require_signer(&state, caller)?;

        Ok(ids
            .iter()
            .copied()
            .filter(|id| self.cancel_locked(&mut state, *id, now).is_ok())
            .collect())
    }

    fn cancel_locked(&self, state: &mut TreasuryState, id: ProposalId, now: DateTime<Utc>) -> Result<(), TreasuryError> {
        let policy = self.policy(state.threshold)?;
        state.book.get_mut(id)?.cancel_expired(&policy, now)?;
        info!(id = %id, "Expired transaction cancelled");
        self.emit(CustodyEvent::TransactionCancelled { id: id.0 });
        Ok(())
    }

    fn check_batch(&self, ids: &[ProposalId]) -> Result<(), TreasuryError> {
        if ids.is_empty() {
            return Err(TreasuryError::EmptyBatch);
        }
        if ids.len() > self.config.max_batch_size {
            return Err(TreasuryError::BatchTooLarge {
                size: ids.len(),
                max: self.config.max_batch_size,
            });
        }
        Ok(())
    }

    // --- Signer administration ---

    pub fn add_signer(&self, caller: &Principal, signer: &Principal) -> Result<(), TreasuryError> {
        self.ctx.access.require_role(Role::SignerAdmin, caller)?;
        let mut state = self.write()?;
        self.insert_signer(&mut state, signer)
    }

    pub fn remove_signer(&self, caller: &Principal, signer: &Principal) -> Result<(), TreasuryError> {
        self.ctx.access.require_role(Role::SignerAdmin, caller)?;
        let mut state = self.write()?;
        self.remove_signer_locked(&mut state, signer)
    }

    pub fn change_threshold(&self, caller: &Principal, threshold: usize) -> Result<(), TreasuryError> {
        self.ctx.access.require_role(Role::SignerAdmin, caller)?;
        let mut state = self.write()?;
        self.change_threshold_locked(&mut state, threshold)
    }

    fn insert_signer(&self, state: &mut TreasuryState, signer: &Principal) -> Result<(), TreasuryError> {
        if signer.is_empty() {
            return Err(TreasuryError::InvalidPrincipal(signer.clone()));
        }
        if state.is_signer(signer) {
            return Err(TreasuryError::DuplicateSigner(signer.clone()));
        }
        if state.signers.len() >= self.config.max_signers {
            return Err(TreasuryError::TooManySigners {
                max: self.config.max_signers,
            });
        }
        state.signers.push(signer.clone());

        info!(signer = %signer, signers = state.signers.len(), "Signer added");
        self.emit(CustodyEvent::SignerAdded {
            signer: signer.clone(),
            signer_count: state.signers.len(),
        });
        Ok(())
    }

    fn remove_signer_locked(&self, state: &mut TreasuryState, signer: &Principal) -> Result<(), TreasuryError> {
        let position = state
            .signers
            .iter()
            .position(|s| s == signer)
            .ok_or_else(|| TreasuryError::SignerNotFound(signer.clone()))?;
        let remaining = state.signers.len() - 1;
        if remaining < state.threshold {
            return Err(TreasuryError::InvalidThreshold {
                threshold: state.threshold,
                signers: remaining,
            });
        }
        state.signers.remove(position);

        warn!(signer = %signer, signers = remaining, "Signer removed");
        self.emit(CustodyEvent::SignerRemoved {
            signer: signer.clone(),
            signer_count: remaining,
        });
        Ok(())
    }

    fn change_threshold_locked(&self, state: &mut TreasuryState, threshold: usize) -> Result<(), TreasuryError> {
        if threshold == 0 || threshold > state.signers.len() {
            return Err(TreasuryError::InvalidThreshold {
                threshold,
                signers: state.signers.len(),
            });
        }
        let previous = state.threshold;
        if previous == threshold {
            debug!(threshold, "Threshold unchanged");
            return Ok(());
        }
        state.threshold = threshold;

        info!(previous, threshold, "Threshold changed");
        self.emit(CustodyEvent::ThresholdChanged {
            previous,
            new: threshold,
        });
        Ok(())
    }

    // --- Funds ---

    /// Move `amount` from `from` into the treasury account.
    pub fn deposit(&self, from: &Principal, amount: Amount) -> Result<Amount, TreasuryError> {
        if amount == 0 {
            return Err(TreasuryError::InvalidAmount);
        }
        self.ctx.ledger.transfer(from, &self.account, amount)?;
        let balance = self.ctx.ledger.balance_of(&self.account);

        info!(from = %from, amount, balance, "Deposit received");
        self.emit(CustodyEvent::Deposit {
            from: from.clone(),
            amount,
            balance,
        });
        Ok(balance)
    }

    // --- Queries ---

    pub fn component_id(&self) -> &ComponentId {
        &self.id
    }

    pub fn account(&self) -> &Principal {
        &self.account
    }

    pub fn config(&self) -> &TreasuryConfig {
        &self.config
    }

    pub fn balance(&self) -> Amount {
        self.ctx.ledger.balance_of(&self.account)
    }

    pub fn signers(&self) -> Result<Vec<Principal>, TreasuryError> {
        Ok(self.read()?.signers.clone())
    }

    pub fn signers_page(&self, page: usize, page_size: usize) -> Result<Page<Principal>, TreasuryError> {
        let state = self.read()?;
        Page::slice(&state.signers, page, page_size, self.config.max_page_size)
    }

    pub fn signer_count(&self) -> Result<usize, TreasuryError> {
        Ok(self.read()?.signers.len())
    }

    pub fn is_signer(&self, principal: &Principal) -> bool {
        self.read().map(|s| s.is_signer(principal)).unwrap_or(false)
    }

    pub fn threshold(&self) -> Result<usize, TreasuryError> {
        Ok(self.read()?.threshold)
    }

    pub fn transaction(&self, id: ProposalId) -> Result<TransactionView, TreasuryError> {
        let now = self.ctx.clock.now();
        let state = self.read()?;
        let policy = self.policy(state.threshold)?;
        let proposal = state.book.get(id)?;

        Ok(TransactionView {
            id,
            action: proposal.action.action.clone(),
            description: proposal.action.description.clone(),
            proposer: proposal.proposer.clone(),
            confirmations: proposal.confirmations().iter().cloned().collect(),
            confirmation_count: proposal.confirmation_count(|p| state.signers.contains(p)),
            threshold: state.threshold,
            status: proposal.status_at(&policy, now),
            created_at: proposal.created_at,
            ready_at: policy.ready_at(proposal.created_at),
            expires_at: policy.expires_at(proposal.created_at),
            executed_at: proposal.executed_at(),
        })
    }

    /// Confirmations from current signers.
    pub fn confirmation_count(&self, id: ProposalId) -> Result<usize, TreasuryError> {
        let state = self.read()?;
        let proposal = state.book.get(id)?;
        Ok(proposal.confirmation_count(|p| state.signers.contains(p)))
    }

    pub fn has_confirmed(&self, id: ProposalId, principal: &Principal) -> Result<bool, TreasuryError> {
        Ok(self.read()?.book.get(id)?.has_confirmed(principal))
    }

    pub fn is_expired(&self, id: ProposalId) -> Result<bool, TreasuryError> {
        let now = self.ctx.clock.now();
        let state = self.read()?;
        let policy = self.policy(state.threshold)?;
        Ok(state.book.get(id)?.is_expired(&policy, now))
    }

    pub fn transaction_status(&self, id: ProposalId) -> Result<ProposalStatus, TreasuryError> {
        Ok(self.transaction(id)?.status)
    }

    /// Ids of transactions still open, oldest first.
    pub fn pending_transactions(&self) -> Result<Vec<ProposalId>, TreasuryError> {
        let now = self.ctx.clock.now();
        let state = self.read()?;
        let policy = self.policy(state.threshold)?;
        Ok(state.book.pending_ids(&policy, now))
    }

    pub fn pending_page(&self, page: usize, page_size: usize) -> Result<Page<ProposalId>, TreasuryError> {
        let pending = self.pending_transactions()?;
        Page::slice(&pending, page, page_size, self.config.max_page_size)
    }

    pub fn transaction_count(&self) -> Result<usize, TreasuryError> {
        Ok(self.read()?.book.len())
    }

    pub fn is_paused(&self) -> bool {
        let now = self.ctx.clock.now();
        self.read().map(|s| s.pause.is_engaged(now)).unwrap_or(true)
    }
}

impl Pausable for MultisigTreasury {
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
            .map_err(|_| SwitchError::Unavailable("treasury state lock poisoned".into()))?;
        state.pause.engage(caller.clone(), now, until);

        warn!(component = %self.id, by = %caller, until = ?until, "Treasury paused");
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
            .map_err(|_| SwitchError::Unavailable("treasury state lock poisoned".into()))?;
        if state.pause.release(caller, now) {
            info!(component = %self.id, by = %caller, "Treasury unpaused");
            self.emit(CustodyEvent::Unpaused { by: caller.clone() });
        } else {
            debug!(component = %self.id, by = %caller, "No engagement held by caller");
        }
        Ok(())
    }

    fn is_paused(&self) -> bool {
        MultisigTreasury::is_paused(self)
    }
}
