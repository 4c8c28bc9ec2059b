//! Shared fixtures for the cross-crate scenario and property tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use custody_runtime::{CustodyConfig, CustodySystem, Genesis};
use custody_types::{Amount, EventLog, InMemoryLedger, ManualClock, Principal};

pub const TREASURY_FUNDS: Amount = 10_000;
pub const REWARD_FUNDS: Amount = 100_000;

pub fn p(s: &str) -> Principal {
    Principal::new(s)
}

/// 2025-04-01 09:00 UTC
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Signers a, b, c with threshold 2; guardians g1..g3; manager and signer
/// admin "ops"; backend "api".
pub fn genesis() -> Genesis {
    Genesis {
        admin: p("admin"),
        managers: vec![p("ops")],
        signer_admins: vec![p("ops")],
        guardians: vec![p("g1"), p("g2"), p("g3")],
        backends: vec![p("api")],
        treasury_account: p("vault"),
        signers: vec![p("a"), p("b"), p("c")],
        threshold: 2,
        rewards_account: p("distributor"),
        pause_authority: p("pause-controller"),
    }
}

/// A bootstrapped system over a manual clock, an audit log and a funded
/// in-memory ledger.
pub struct Harness {
    pub system: CustodySystem,
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<InMemoryLedger>,
    pub events: Arc<EventLog>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CustodyConfig::default())
    }

    pub fn with_config(config: CustodyConfig) -> Self {
        Self::build(config, genesis())
    }

    /// # Panics
    /// If bootstrap fails; harness inputs are expected to be valid.
    pub fn build(config: CustodyConfig, genesis: Genesis) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let events = Arc::new(EventLog::new());
        let ledger = Arc::new(InMemoryLedger::with_balances([
            (genesis.treasury_account.clone(), TREASURY_FUNDS),
            (genesis.rewards_account.clone(), REWARD_FUNDS),
        ]));
        let system = CustodySystem::bootstrap(
            &config,
            &genesis,
            ledger.clone(),
            clock.clone(),
            events.clone(),
        )
        .unwrap_or_else(|e| panic!("harness bootstrap failed: {e:#}"));
        Self {
            system,
            clock,
            ledger,
            events,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
