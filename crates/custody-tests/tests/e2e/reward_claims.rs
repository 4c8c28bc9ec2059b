//! End-to-end test: reward issuance through templates, referrals and
//! backend grants, plus treasury sweeps.

use custody_rewards::{RewardError, RewardTemplate};
use custody_tests::{p, Harness, REWARD_FUNDS};
use custody_types::{ErrorKind, Ledger, Role};

#[test]
fn welcome_bonus_once_per_principal() {
    let h = Harness::new();
    let rewards = &h.system.rewards;

    let receipt = rewards.claim("welcome_bonus", &p("newcomer")).unwrap();
    assert_eq!(receipt.amount, 10);
    assert_eq!(h.ledger.balance_of(&p("newcomer")), 10);

    let err = rewards.claim("welcome_bonus", &p("newcomer")).unwrap_err();
    assert!(matches!(err, RewardError::AlreadyClaimed { .. }));
    assert_eq!(h.ledger.balance_of(&p("newcomer")), 10);
    assert_eq!(rewards.balance(), REWARD_FUNDS - 10);

    // another principal is unaffected
    rewards.claim("welcome_bonus", &p("other")).unwrap();
}

#[test]
fn backend_issues_custom_rewards() {
    let h = Harness::new();
    let rewards = &h.system.rewards;

    rewards
        .issue_custom_reward(&p("api"), &p("contributor"), 250, "docs sprint")
        .unwrap();
    assert_eq!(h.ledger.balance_of(&p("contributor")), 250);

    // manager revokes the backend through the engine
    rewards.set_authorized_backend(&p("ops"), &p("api"), false).unwrap();
    assert!(!h.system.registry.has_role(Role::Backend, &p("api")));
    assert_eq!(
        rewards
            .issue_custom_reward(&p("api"), &p("contributor"), 1, "late")
            .unwrap_err()
            .kind(),
        ErrorKind::Unauthorized
    );
}

#[test]
fn managers_curate_templates_and_whitelist() {
    let h = Harness::new();
    let rewards = &h.system.rewards;

    rewards
        .upsert_template(&p("ops"), RewardTemplate::new("beta_tester", 75).one_time().whitelisted())
        .unwrap();
    assert!(matches!(
        rewards.claim("beta_tester", &p("tester")),
        Err(RewardError::NotWhitelisted(_))
    ));
    rewards.add_to_whitelist(&p("ops"), &[p("tester")]).unwrap();
    assert!(rewards.can_claim(&p("tester"), "beta_tester").eligible);
    rewards.claim("beta_tester", &p("tester")).unwrap();

    rewards.set_template_active(&p("ops"), "beta_tester", false).unwrap();
    assert!(!rewards.can_claim(&p("tester2"), "beta_tester").eligible);
}

#[test]
fn referral_bonus_pays_referrer_once() {
    let h = Harness::new();
    let rewards = &h.system.rewards;
    rewards.claim_referral_bonus(&p("friend"), &p("host")).unwrap();
    assert_eq!(h.ledger.balance_of(&p("host")), 20);
    assert!(rewards.claim_referral_bonus(&p("friend"), &p("host")).is_err());
    assert_eq!(rewards.referral_count(&p("host")), 1);
}

#[test]
fn treasury_account_sweeps_distributor() {
    let h = Harness::new();
    let rewards = &h.system.rewards;
    let vault = h.system.treasury.account().clone();

    assert!(matches!(
        rewards.treasury_sweep(&p("ops"), &p("ops"), 10),
        Err(RewardError::NotTreasury(_))
    ));
    rewards.treasury_sweep(&vault, &vault, 50_000).unwrap();
    assert_eq!(rewards.balance(), REWARD_FUNDS - 50_000);
    assert_eq!(h.system.treasury.balance(), custody_tests::TREASURY_FUNDS + 50_000);
}
