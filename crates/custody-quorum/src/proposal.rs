use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use custody_types::Principal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::QuorumError;
use crate::policy::QuorumPolicy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProposalId(pub u64);

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    Pending,
    Executed,
    Expired,
    Cancelled,
    /// Effects were applied only in part and could not be undone
    Failed,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }
}

/// Where a pending proposal stands relative to its policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    AwaitingConfirmations { have: usize, need: usize },
    Delayed { ready_at: DateTime<Utc> },
    Ready,
    Closed(ProposalStatus),
}

/// A proposed action collecting confirmations.
///
/// The proposer's confirmation is recorded at creation. Confirmations are
/// stored as raw principals; whether each one still counts is decided at
/// evaluation time through an eligibility predicate, so a confirmer who
/// later loses signer or guardian status stops contributing to quorum.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proposal<A> {
    pub id: ProposalId,
    pub action: A,
    pub proposer: Principal,
    pub created_at: DateTime<Utc>,
    confirmations: BTreeSet<Principal>,
    status: ProposalStatus,
    executed_at: Option<DateTime<Utc>>,
}

impl<A> Proposal<A> {
    pub fn new(id: ProposalId, proposer: Principal, action: A, now: DateTime<Utc>) -> Self {
        let mut confirmations = BTreeSet::new();
        confirmations.insert(proposer.clone());
        Self {
            id,
            action,
            proposer,
            created_at: now,
            confirmations,
            status: ProposalStatus::Pending,
            executed_at: None,
        }
    }

    /// Stored status, without lazy expiry.
    pub fn recorded_status(&self) -> ProposalStatus {
        self.status
    }

    /// Status as observed at `now`: a pending proposal past its expiry reads
    /// as `Expired` even before anyone persists that transition.
    pub fn status_at(&self, policy: &QuorumPolicy, now: DateTime<Utc>) -> ProposalStatus {
        match self.status {
            ProposalStatus::Pending if now >= policy.expires_at(self.created_at) => {
                ProposalStatus::Expired
            }
            status => status,
        }
    }

    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        self.executed_at
    }

    pub fn confirmations(&self) -> &BTreeSet<Principal> {
        &self.confirmations
    }

    pub fn has_confirmed(&self, principal: &Principal) -> bool {
        self.confirmations.contains(principal)
    }

    /// Confirmations from principals that are still eligible.
    pub fn confirmation_count(&self, eligible: impl Fn(&Principal) -> bool) -> usize {
        self.confirmations.iter().filter(|p| eligible(*p)).count()
    }

    pub fn is_expired(&self, policy: &QuorumPolicy, now: DateTime<Utc>) -> bool {
        self.status_at(policy, now) == ProposalStatus::Expired
    }

    /// Persist lazy expiry. Returns true if the proposal just flipped to
    /// `Expired`.
    pub fn refresh(&mut self, policy: &QuorumPolicy, now: DateTime<Utc>) -> bool {
        if self.status == ProposalStatus::Pending && self.is_expired(policy, now) {
            debug!(proposal = %self.id, "Proposal expired");
            self.status = ProposalStatus::Expired;
            return true;
        }
        false
    }

    fn ensure_open(&mut self, policy: &QuorumPolicy, now: DateTime<Utc>) -> Result<(), QuorumError> {
        self.refresh(policy, now);
        match self.status {
            ProposalStatus::Pending => Ok(()),
            ProposalStatus::Executed => Err(QuorumError::AlreadyExecuted(self.id)),
            ProposalStatus::Expired => Err(QuorumError::Expired(self.id)),
            ProposalStatus::Cancelled => Err(QuorumError::Cancelled(self.id)),
            ProposalStatus::Failed => Err(QuorumError::Failed(self.id)),
        }
    }

    /// Record a confirmation. Returns the raw confirmation count.
    pub fn confirm(
        &mut self,
        principal: &Principal,
        policy: &QuorumPolicy,
        now: DateTime<Utc>,
    ) -> Result<usize, QuorumError> {
        self.ensure_open(policy, now)?;
        if !self.confirmations.insert(principal.clone()) {
            return Err(QuorumError::AlreadyConfirmed {
                id: self.id,
                principal: principal.clone(),
            });
        }
        Ok(self.confirmations.len())
    }

    /// Withdraw a confirmation. Returns the raw confirmation count.
    pub fn revoke(
        &mut self,
        principal: &Principal,
        policy: &QuorumPolicy,
        now: DateTime<Utc>,
    ) -> Result<usize, QuorumError> {
        self.ensure_open(policy, now)?;
        if !self.confirmations.remove(principal) {
            return Err(QuorumError::NotConfirmed {
                id: self.id,
                principal: principal.clone(),
            });
        }
        Ok(self.confirmations.len())
    }

    pub fn readiness(
        &self,
        policy: &QuorumPolicy,
        now: DateTime<Utc>,
        eligible: impl Fn(&Principal) -> bool,
    ) -> Readiness {
        let status = self.status_at(policy, now);
        if status.is_terminal() {
            return Readiness::Closed(status);
        }
        let have = self.confirmation_count(eligible);
        if have < policy.threshold {
            return Readiness::AwaitingConfirmations {
                have,
                need: policy.threshold,
            };
        }
        let ready_at = policy.ready_at(self.created_at);
        if now < ready_at {
            return Readiness::Delayed { ready_at };
        }
        Readiness::Ready
    }

    /// Check that the proposal may execute now. Persists lazy expiry.
    pub fn ensure_executable(
        &mut self,
        policy: &QuorumPolicy,
        now: DateTime<Utc>,
        eligible: impl Fn(&Principal) -> bool,
    ) -> Result<(), QuorumError> {
        self.ensure_open(policy, now)?;
        match self.readiness(policy, now, eligible) {
            Readiness::Ready => Ok(()),
            Readiness::AwaitingConfirmations { have, need } => {
                Err(QuorumError::InsufficientConfirmations {
                    id: self.id,
                    have,
                    need,
                })
            }
            Readiness::Delayed { ready_at } => Err(QuorumError::DelayNotElapsed {
                id: self.id,
                ready_at,
            }),
            Readiness::Closed(_) => Err(QuorumError::Expired(self.id)),
        }
    }

    /// Transition to `Executed`. Callers check `ensure_executable` first and
    /// apply the action's effects before marking.
    pub fn mark_executed(&mut self, now: DateTime<Utc>) {
        self.status = ProposalStatus::Executed;
        self.executed_at = Some(now);
    }

    /// Close a proposal whose effects were partly applied and could not be
    /// reverted. It can never be confirmed or executed again.
    pub fn mark_failed(&mut self, now: DateTime<Utc>) {
        debug!(proposal = %self.id, at = %now, "Proposal failed");
        self.status = ProposalStatus::Failed;
    }

    /// Move an expired proposal to `Cancelled`.
    pub fn cancel_expired(&mut self, policy: &QuorumPolicy, now: DateTime<Utc>) -> Result<(), QuorumError> {
        match self.status_at(policy, now) {
            ProposalStatus::Pending => Err(QuorumError::NotExpired(self.id)),
            ProposalStatus::Expired => {
                self.status = ProposalStatus::Cancelled;
                Ok(())
            }
            ProposalStatus::Executed => Err(QuorumError::AlreadyExecuted(self.id)),
            ProposalStatus::Cancelled => Err(QuorumError::Cancelled(self.id)),
            ProposalStatus::Failed => Err(QuorumError::Failed(self.id)),
        }
    }
}

/// Owner of every proposal of one quorum instance. Ids are sequential.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProposalBook<A> {
    next_id: u64,
    proposals: BTreeMap<ProposalId, Proposal<A>>,
}

impl<A> Default for ProposalBook<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> ProposalBook<A> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            proposals: BTreeMap::new(),
        }
    }

    pub fn open(&mut self, proposer: Principal, action: A, now: DateTime<Utc>) -> ProposalId {
        let id = ProposalId(self.next_id);
        self.next_id += 1;
        self.proposals
            .insert(id, Proposal::new(id, proposer, action, now));
        id
    }

    pub fn get(&self, id: ProposalId) -> Result<&Proposal<A>, QuorumError> {
        self.proposals.get(&id).ok_or(QuorumError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: ProposalId) -> Result<&mut Proposal<A>, QuorumError> {
        self.proposals.get_mut(&id).ok_or(QuorumError::NotFound(id))
    }

    /// Drop a proposal whose effects could not be applied. The id is not
    /// reused.
    pub fn discard(&mut self, id: ProposalId) -> Result<Proposal<A>, QuorumError> {
        self.proposals.remove(&id).ok_or(QuorumError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal<A>> {
        self.proposals.values()
    }

    /// Ids still open at `now`, oldest first.
    pub fn pending_ids(&self, policy: &QuorumPolicy, now: DateTime<Utc>) -> Vec<ProposalId> {
        self.proposals
            .values()
            .filter(|p| p.status_at(policy, now) == ProposalStatus::Pending)
            .map(|p| p.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn p(s: &str) -> Principal {
        Principal::new(s)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn treasury_policy() -> QuorumPolicy {
        QuorumPolicy::new(2, Duration::hours(1), Duration::days(7)).unwrap()
    }

    fn anyone(_: &Principal) -> bool {
        true
    }

    #[test]
    fn proposer_counts_as_first_confirmation() {
        let proposal = Proposal::new(ProposalId(0), p("a"), (), t0());
        assert!(proposal.has_confirmed(&p("a")));
        assert_eq!(proposal.confirmation_count(anyone), 1);
    }

    #[test]
    fn double_confirm_rejected() {
        let policy = treasury_policy();
        let mut proposal = Proposal::new(ProposalId(0), p("a"), (), t0());
        assert_eq!(proposal.confirm(&p("b"), &policy, t0()).unwrap(), 2);
        assert!(matches!(
            proposal.confirm(&p("b"), &policy, t0()),
            Err(QuorumError::AlreadyConfirmed { .. })
        ));
    }

    #[test]
    fn delay_then_execute_once() {
        let policy = treasury_policy();
        let mut proposal = Proposal::new(ProposalId(3), p("a"), (), t0());
        proposal.confirm(&p("b"), &policy, t0()).unwrap();

        let early = proposal
            .ensure_executable(&policy, t0() + Duration::minutes(30), anyone)
            .unwrap_err();
        assert!(matches!(early, QuorumError::DelayNotElapsed { .. }));

        let at = t0() + Duration::hours(1);
        proposal.ensure_executable(&policy, at, anyone).unwrap();
        proposal.mark_executed(at);

        assert!(matches!(
            proposal.ensure_executable(&policy, at, anyone),
            Err(QuorumError::AlreadyExecuted(ProposalId(3)))
        ));
        assert_eq!(proposal.executed_at(), Some(at));
    }

    #[test]
    fn ineligible_confirmations_do_not_count() {
        let policy = treasury_policy();
        let mut proposal = Proposal::new(ProposalId(0), p("a"), (), t0());
        proposal.confirm(&p("removed"), &policy, t0()).unwrap();

        let still_signer = |who: &Principal| who.as_str() != "removed";
        assert_eq!(
            proposal.readiness(&policy, t0() + Duration::hours(2), still_signer),
            Readiness::AwaitingConfirmations { have: 1, need: 2 }
        );
    }

    #[test]
    fn expiry_is_lazy_and_terminal() {
        let policy = treasury_policy();
        let mut proposal = Proposal::new(ProposalId(0), p("a"), (), t0());
        let late = t0() + Duration::days(7);

        assert_eq!(proposal.recorded_status(), ProposalStatus::Pending);
        assert_eq!(proposal.status_at(&policy, late), ProposalStatus::Expired);
        assert!(matches!(
            proposal.confirm(&p("b"), &policy, late),
            Err(QuorumError::Expired(_))
        ));
        assert_eq!(proposal.recorded_status(), ProposalStatus::Expired);
    }

    #[test]
    fn revoke_requires_prior_confirmation() {
        let policy = treasury_policy();
        let mut proposal = Proposal::new(ProposalId(0), p("a"), (), t0());
        assert!(matches!(
            proposal.revoke(&p("b"), &policy, t0()),
            Err(QuorumError::NotConfirmed { .. })
        ));
        assert_eq!(proposal.revoke(&p("a"), &policy, t0()).unwrap(), 0);
    }

    #[test]
    fn cancel_only_after_expiry() {
        let policy = treasury_policy();
        let mut proposal = Proposal::new(ProposalId(0), p("a"), (), t0());
        assert!(matches!(
            proposal.cancel_expired(&policy, t0() + Duration::days(1)),
            Err(QuorumError::NotExpired(_))
        ));
        proposal
            .cancel_expired(&policy, t0() + Duration::days(8))
            .unwrap();
        assert_eq!(proposal.recorded_status(), ProposalStatus::Cancelled);
        assert!(matches!(
            proposal.cancel_expired(&policy, t0() + Duration::days(9)),
            Err(QuorumError::Cancelled(_))
        ));
    }

    #[test]
    fn book_assigns_sequential_ids_and_tracks_pending() {
        let policy = treasury_policy();
        let mut book = ProposalBook::new();
        let first = book.open(p("a"), "first", t0());
        let second = book.open(p("a"), "second", t0() + Duration::days(3));
        assert_eq!(first, ProposalId(0));
        assert_eq!(second, ProposalId(1));

        let later = t0() + Duration::days(8);
        assert_eq!(book.pending_ids(&policy, later), vec![second]);
        assert_eq!(book.get(first).unwrap().status_at(&policy, later), ProposalStatus::Expired);
        assert!(matches!(
            book.get(ProposalId(9)),
            Err(QuorumError::NotFound(_))
        ));
    }

    #[test]
    fn failed_proposal_is_closed() {
        let policy = treasury_policy();
        let mut proposal = Proposal::new(ProposalId(0), p("a"), (), t0());
        proposal.confirm(&p("b"), &policy, t0()).unwrap();
        proposal.mark_failed(t0() + Duration::hours(2));

        assert_eq!(proposal.status_at(&policy, t0() + Duration::days(30)), ProposalStatus::Failed);
        assert!(proposal.executed_at().is_none());
        assert!(matches!(
            proposal.ensure_executable(&policy, t0() + Duration::hours(3), anyone),
            Err(QuorumError::Failed(_))
        ));
        assert!(matches!(
            proposal.confirm(&p("c"), &policy, t0() + Duration::hours(3)),
            Err(QuorumError::Failed(_))
        ));
        assert!(matches!(
            proposal.cancel_expired(&policy, t0() + Duration::days(8)),
            Err(QuorumError::Failed(_))
        ));
    }

    #[test]
    fn discarded_ids_are_not_reused() {
        let mut book = ProposalBook::new();
        let first = book.open(p("g1"), (), t0());
        assert!(book.discard(first).is_ok());
        assert!(book.discard(first).is_err());
        let second = book.open(p("g1"), (), t0());
        assert_eq!(second, ProposalId(1));
        assert_eq!(book.len(), 1);
    }

    proptest! {
        #[test]
        fn executable_iff_quorum_and_window(
            extra in 0usize..4,
            threshold in 1usize..5,
            elapsed_secs in 0i64..(8 * 24 * 3600),
        ) {
            let policy = QuorumPolicy::new(threshold, Duration::hours(1), Duration::days(7)).unwrap();
            let mut proposal = Proposal::new(ProposalId(0), p("s0"), (), t0());
            for i in 0..extra {
                proposal.confirm(&p(&format!("s{}", i + 1)), &policy, t0()).unwrap();
            }
            let now = t0() + Duration::seconds(elapsed_secs);
            let confirmations = extra + 1;
            let expected = confirmations >= threshold
                && elapsed_secs >= 3600
                && elapsed_secs < 7 * 24 * 3600;
            prop_assert_eq!(proposal.ensure_executable(&policy, now, anyone).is_ok(), expected);
        }
    }
}
