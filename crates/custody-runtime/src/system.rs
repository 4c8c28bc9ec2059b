use std::sync::Arc;

use anyhow::{bail, Context};
use custody_pause::EmergencyPauseController;
use custody_rewards::RewardDistributionEngine;
use custody_roles::{CustodyContext, RoleRegistry};
use custody_treasury::MultisigTreasury;
use custody_types::{
    Amount, Clock, EventSink, InMemoryLedger, Ledger, Principal, Role, SystemClock, TracingSink,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::CustodyConfig;

/// Principals and accounts a fresh custody core starts with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genesis {
    pub admin: Principal,

    /// The first manager also tracks components on the pause controller
    pub managers: Vec<Principal>,

    #[serde(default)]
    pub signer_admins: Vec<Principal>,

    pub guardians: Vec<Principal>,

    #[serde(default)]
    pub backends: Vec<Principal>,

    pub treasury_account: Principal,
    pub signers: Vec<Principal>,
    pub threshold: usize,

    pub rewards_account: Principal,

    /// Principal the pause controller acts as; granted the pauser role
    pub pause_authority: Principal,
}

/// A wired custody core.
pub struct CustodySystem {
    pub registry: Arc<RoleRegistry>,
    pub treasury: Arc<MultisigTreasury>,
    pub rewards: Arc<RewardDistributionEngine>,
    pub pause: Arc<EmergencyPauseController>,
    pub ledger: Arc<dyn Ledger>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventSink>,
}

impl CustodySystem {
    /// Build every component over the given collaborators.
    ///
    /// Order: registry and role grants, treasury and reward engine,
    /// component registration, pauser grant to the controller authority,
    /// controller construction, component tracking.
    pub fn bootstrap(
        config: &CustodyConfig,
        genesis: &Genesis,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let Some(manager) = genesis.managers.first() else {
            bail!("genesis needs at least one manager");
        };

        let admin = &genesis.admin;
        let registry = Arc::new(
            RoleRegistry::new(admin.clone(), clock.clone(), events.clone())
                .context("creating role registry")?,
        );
        registry
            .batch_grant_role(admin, Role::Manager, &genesis.managers)
            .context("granting managers")?;
        if !genesis.signer_admins.is_empty() {
            registry
                .batch_grant_role(admin, Role::SignerAdmin, &genesis.signer_admins)
                .context("granting signer admins")?;
        }
        registry
            .batch_grant_role(admin, Role::Guardian, &genesis.guardians)
            .context("granting guardians")?;
        if !genesis.backends.is_empty() {
            registry
                .batch_grant_role(manager, Role::Backend, &genesis.backends)
                .context("authorizing backends")?;
        }

        let ctx = CustodyContext::new(registry.clone(), ledger.clone(), clock.clone(), events.clone());

        let treasury = Arc::new(
            MultisigTreasury::new(
                config.treasury.clone(),
                genesis.treasury_account.clone(),
                genesis.signers.clone(),
                genesis.threshold,
                ctx.clone(),
            )
            .context("creating multisig treasury")?,
        );

        let mut reward_config = config.rewards.clone();
        if reward_config.treasury.is_none() {
            reward_config.treasury = Some(genesis.treasury_account.clone());
        }
        let rewards = Arc::new(
            RewardDistributionEngine::new(reward_config, genesis.rewards_account.clone(), ctx.clone())
                .context("creating reward engine")?,
        );

        registry
            .register_component(admin, treasury.component_id().clone(), "Multisig treasury")
            .context("registering treasury")?;
        registry
            .register_component(admin, rewards.component_id().clone(), "Reward distributor")
            .context("registering reward engine")?;
        registry
            .grant_role(admin, Role::Pauser, &genesis.pause_authority)
            .context("granting pauser to controller")?;

        let pause = Arc::new(
            EmergencyPauseController::new(config.pause.clone(), genesis.pause_authority.clone(), ctx)
                .context("creating emergency pause controller")?,
        );
        pause
            .add_component(manager, treasury.clone())
            .context("tracking treasury")?;
        pause
            .add_component(manager, rewards.clone())
            .context("tracking reward engine")?;

        info!(
            treasury = %treasury.component_id(),
            rewards = %rewards.component_id(),
            guardians = pause.guardian_count(),
            "Custody system bootstrapped"
        );

        Ok(Self {
            registry,
            treasury,
            rewards,
            pause,
            ledger,
            clock,
            events,
        })
    }

    /// Bootstrap over an in-memory ledger seeded with `balances`, the system
    /// clock and a tracing audit sink.
    pub fn in_memory(
        config: &CustodyConfig,
        genesis: &Genesis,
        balances: impl IntoIterator<Item = (Principal, Amount)>,
    ) -> anyhow::Result<Self> {
        Self::bootstrap(
            config,
            genesis,
            Arc::new(InMemoryLedger::with_balances(balances)),
            Arc::new(SystemClock),
            Arc::new(TracingSink),
        )
    }
}

impl std::fmt::Debug for CustodySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustodySystem")
            .field("treasury", self.treasury.component_id())
            .field("rewards", self.rewards.component_id())
            .field("pause", self.pause.component_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_types::{ComponentId, EventLog, ManualClock};

    fn p(s: &str) -> Principal {
        Principal::new(s)
    }

    fn genesis() -> Genesis {
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
            pause_authority: p("guardian-controller"),
        }
    }

    #[test]
    fn bootstrap_wires_roles_and_components() {
        let system = CustodySystem::in_memory(
            &CustodyConfig::default(),
            &genesis(),
            [(p("distributor"), 1_000)],
        )
        .unwrap();

        assert!(system.registry.has_role(Role::Pauser, &p("guardian-controller")));
        assert!(system.registry.has_role(Role::Backend, &p("api")));
        assert_eq!(system.registry.member_count(Role::Guardian), 3);
        assert_eq!(
            system.pause.tracked_components(),
            vec![
                ComponentId::new("multisig-treasury"),
                ComponentId::new("reward-distributor")
            ]
        );
        assert_eq!(system.treasury.threshold().unwrap(), 2);
        assert_eq!(system.rewards.balance(), 1_000);
    }

    #[test]
    fn guardian_pause_reaches_components() {
        let clock = Arc::new(ManualClock::default());
        let events = Arc::new(EventLog::new());
        let system = CustodySystem::bootstrap(
            &CustodyConfig::default(),
            &genesis(),
            Arc::new(InMemoryLedger::with_balances([(p("distributor"), 100)])),
            clock,
            events,
        )
        .unwrap();

        let rewards = ComponentId::new("reward-distributor");
        let id = system.pause.request_pause(&p("g1"), &rewards, "drain").unwrap().id;
        system.pause.confirm_pause(&p("g2"), id).unwrap();
        assert!(system.rewards.is_paused());
        assert!(!system.treasury.is_paused());
        assert!(system.rewards.claim("welcome_bonus", &p("user")).is_err());
    }

    #[test]
    fn bootstrap_requires_a_manager() {
        let mut genesis = genesis();
        genesis.managers.clear();
        assert!(CustodySystem::in_memory(&CustodyConfig::default(), &genesis, std::iter::empty()).is_err());
    }

    #[test]
    fn bootstrap_requires_guardian_floor() {
        let mut genesis = genesis();
        genesis.guardians.truncate(2);
        let err = CustodySystem::in_memory(&CustodyConfig::default(), &genesis, std::iter::empty()).unwrap_err();
        assert!(format!("{err:#}").contains("guardians"));
    }
}
