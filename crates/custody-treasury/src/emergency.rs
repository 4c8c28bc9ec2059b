//! Emergency withdrawal while paused.
//!
//! While the treasury is paused, signers may pull up to a configured share
//! of the balance out without the execution delay. Approvals for one
//! `(recipient, amount)` accumulate; the approval that reaches the threshold
//! moves the funds and resets the round.

use custody_quorum::{Proposal, ProposalId, QuorumError, QuorumPolicy};
use custody_types::{Amount, CustodyEvent, Principal};
use tracing::{info, warn};

use crate::error::TreasuryError;
use crate::treasury::MultisigTreasury;
use crate::types::{EmergencyOutcome, EmergencyWithdrawal};

impl MultisigTreasury {
    /// Largest amount one emergency withdrawal may move right now.
    pub fn emergency_limit(&self) -> Amount {
        let balance = self.balance() as u128;
        (balance * self.config.emergency_max_share_bps as u128 / 10_000) as Amount
    }

    /// Approve (and, on the threshold-th approval, execute) an emergency
    /// withdrawal.
    pub fn emergency_withdraw(
        &self,
        caller: &Principal,
        recipient: &Principal,
        amount: Amount,
    ) -> Result<EmergencyOutcome, TreasuryError> {
        if recipient.is_empty() {
            return Err(TreasuryError::InvalidPrincipal(recipient.clone()));
        }
        if amount == 0 {
            return Err(TreasuryError::InvalidAmount);
        }

        let now = self.ctx.clock.now();
        let mut guard = self.write()?;
        let state = &mut *guard;
        Self::require_signer(state, caller)?;
        if !state.pause.is_engaged(now) {
            return Err(TreasuryError::NotPaused);
        }
        let max = self.emergency_limit();
        if amount > max {
            warn!(amount, max, "Emergency withdrawal above limit");
            return Err(TreasuryError::EmergencyLimitExceeded { amount, max });
        }

        let policy = QuorumPolicy::immediate(state.threshold, self.config.expiry())?;
        let requested = EmergencyWithdrawal {
            recipient: recipient.clone(),
            amount,
        };

        // Work on a copy so a failed transfer leaves the round untouched.
        let round = match state.emergency.as_ref() {
            Some(open) if !open.is_expired(&policy, now) => {
                if open.action != requested {
                    return Err(TreasuryError::EmergencyMismatch {
                        recipient: open.action.recipient.clone(),
                        amount: open.action.amount,
                    });
                }
                let mut round = open.clone();
                round
                    .confirm(caller, &policy, now)
                    .map_err(|e| match e {
                        QuorumError::AlreadyConfirmed { principal, .. } => {
                            TreasuryError::AlreadyApprovedEmergency(principal)
                        }
                        other => TreasuryError::Quorum(other),
                    })?;
                round
            }
            _ => Proposal::new(
                ProposalId(state.emergency_rounds),
                caller.clone(),
                requested,
                now,
            ),
        };

        let signers = state.signer_set();
        let approvals = round.confirmation_count(|p| signers.contains(p));
        let executes = approvals >= state.threshold;

        if executes {
            self.ctx.ledger.transfer(&self.account, recipient, amount)?;
        }

        info!(signer = %caller, recipient = %recipient, amount, approvals, "Emergency withdrawal approved");
        self.emit(CustodyEvent::EmergencyApproval {
            signer: caller.clone(),
            recipient: recipient.clone(),
            amount,
            approvals,
        });

        if !executes {
            state.emergency = Some(round);
            return Ok(EmergencyOutcome::Approved {
                approvals,
                required: state.threshold,
            });
        }

        state.emergency = None;
        state.emergency_rounds += 1;

        warn!(recipient = %recipient, amount, "Emergency withdrawal executed");
        self.emit(CustodyEvent::EmergencyWithdrawal {
            recipient: recipient.clone(),
            amount,
        });
        Ok(EmergencyOutcome::Executed {
            recipient: recipient.clone(),
            amount,
        })
    }

    /// Approvals from current signers on the open emergency round.
    pub fn emergency_approvals(&self) -> Result<usize, TreasuryError> {
        let now = self.ctx.clock.now();
        let state = self.read()?;
        let policy = QuorumPolicy::immediate(state.threshold, self.config.expiry())?;
        Ok(state
            .emergency
            .as_ref()
            .filter(|round| !round.is_expired(&policy, now))
            .map(|round| round.confirmation_count(|p| state.signers.contains(p)))
            .unwrap_or(0))
    }

    /// The withdrawal currently collecting approvals.
    pub fn pending_emergency(&self) -> Result<Option<EmergencyWithdrawal>, TreasuryError> {
        let now = self.ctx.clock.now();
        let state = self.read()?;
        let policy = QuorumPolicy::immediate(state.threshold, self.config.expiry())?;
        Ok(state
            .emergency
            .as_ref()
            .filter(|round| !round.is_expired(&policy, now))
            .map(|round| round.action.clone()))
    }
}
