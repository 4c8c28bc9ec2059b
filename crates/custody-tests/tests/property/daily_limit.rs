//! Property tests: concurrent claims never push issuance past the daily
//! limits, and the ledger conserves value.

use std::thread;

use custody_rewards::{RewardConfig, RewardTemplate};
use custody_runtime::CustodyConfig;
use custody_tests::{p, Harness, REWARD_FUNDS};
use custody_types::{Amount, Ledger};
use proptest::prelude::*;

fn harness(global_limit: Amount, template_limit: Option<Amount>, amount: Amount) -> Harness {
    let mut quest = RewardTemplate::new("quest", amount);
    quest.daily_limit = template_limit;
    Harness::with_config(CustodyConfig {
        rewards: RewardConfig {
            daily_global_limit: global_limit,
            max_custom_reward: 1,
            templates: vec![quest],
            ..RewardConfig::default()
        },
        ..CustodyConfig::default()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn concurrent_claims_respect_global_limit(
        amount in 1u64..50,
        global_limit in 50u64..2_000,
        threads in 2usize..8,
        claims_per_thread in 1usize..40,
    ) {
        let h = harness(global_limit, None, amount);
        let rewards = &h.system.rewards;

        let successes: usize = thread::scope(|s| {
            let workers: Vec<_> = (0..threads)
                .map(|t| {
                    s.spawn(move || {
                        (0..claims_per_thread)
                            .filter(|i| rewards.claim("quest", &p(&format!("user-{t}-{i}"))).is_ok())
                            .count()
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).sum()
        });

        let issued = successes as Amount * amount;
        prop_assert!(issued <= global_limit);
        prop_assert_eq!(rewards.issued_today(), issued);
        prop_assert_eq!(rewards.balance() + issued, REWARD_FUNDS);

        let attempted = (threads * claims_per_thread) as Amount * amount;
        if attempted <= global_limit {
            prop_assert_eq!(issued, attempted);
        } else {
            prop_assert!(global_limit - issued < amount);
        }
    }

    #[test]
    fn template_limit_binds_before_global(
        amount in 1u64..20,
        template_limit in 20u64..200,
        threads in 2usize..6,
    ) {
        let h = harness(100_000, Some(template_limit), amount);
        let rewards = &h.system.rewards;

        thread::scope(|s| {
            for t in 0..threads {
                s.spawn(move || {
                    for i in 0..50 {
                        let _ = rewards.claim("quest", &p(&format!("user-{t}-{i}")));
                    }
                });
            }
        });

        let issued = rewards.issued_today();
        prop_assert!(issued <= template_limit);
        prop_assert_eq!(rewards.remaining_template_limit("quest").unwrap(), Some(template_limit - issued));
        prop_assert_eq!(h.ledger.balance_of(&p("distributor")), REWARD_FUNDS - issued);
    }
}
