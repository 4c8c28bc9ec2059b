//! Property tests: signers confirming the same transaction from many threads
//! never lose or duplicate a confirmation.

use std::thread;

use custody_runtime::CustodyConfig;
use custody_tests::{genesis, p, Harness};
use custody_types::{CustodyEvent, Principal};
use proptest::prelude::*;

fn harness(signers: usize) -> (Harness, Vec<Principal>) {
    let signer_set: Vec<Principal> = (0..signers).map(|i| p(&format!("signer-{i}"))).collect();
    let mut genesis = genesis();
    genesis.signers = signer_set.clone();
    genesis.threshold = signers.min(3);
    (Harness::build(CustodyConfig::default(), genesis), signer_set)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn concurrent_confirmations_are_not_lost(
        signers in 2usize..=20,
        attempts in 1usize..4,
    ) {
        let (h, signer_set) = harness(signers);
        let treasury = &h.system.treasury;
        let id = treasury
            .propose_transaction(&signer_set[0], p("bob"), 10, Vec::new(), "payout")
            .unwrap();

        let accepted: usize = thread::scope(|s| {
            let workers: Vec<_> = signer_set[1..]
                .iter()
                .flat_map(|signer| (0..attempts).map(move |_| signer))
                .map(|signer| s.spawn(move || treasury.confirm_transaction(signer, id).is_ok()))
                .collect();
            workers.into_iter().map(|w| usize::from(w.join().unwrap())).sum()
        });

        prop_assert_eq!(accepted, signers - 1);
        prop_assert_eq!(treasury.confirmation_count(id).unwrap(), signers);
        for signer in &signer_set {
            prop_assert!(treasury.has_confirmed(id, signer).unwrap());
        }

        let confirmed: Vec<Principal> = h
            .events
            .events()
            .into_iter()
            .filter_map(|e| match e.event {
                CustodyEvent::TransactionConfirmed { id: tx, signer, .. } if tx == id.0 => Some(signer),
                _ => None,
            })
            .collect();
        prop_assert_eq!(confirmed.len(), signers - 1);
        for signer in &signer_set[1..] {
            prop_assert_eq!(confirmed.iter().filter(|s| *s == signer).count(), 1);
        }
    }
}
