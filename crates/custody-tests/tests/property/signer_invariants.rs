//! Property tests: arbitrary signer administration never breaks the signer
//! set invariants.

use std::collections::BTreeSet;

use custody_tests::{p, Harness};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum SignerOp {
    Add(u8),
    Remove(u8),
    Threshold(usize),
}

fn arb_op() -> impl Strategy<Value = SignerOp> {
    prop_oneof![
        (0u8..25).prop_map(SignerOp::Add),
        (0u8..25).prop_map(SignerOp::Remove),
        (0usize..25).prop_map(SignerOp::Threshold),
    ]
}

fn signer(i: u8) -> custody_types::Principal {
    match i {
        0 => p("a"),
        1 => p("b"),
        2 => p("c"),
        n => p(&format!("signer-{n}")),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn signer_set_invariants_hold(ops in prop::collection::vec(arb_op(), 1..60)) {
        let h = Harness::new();
        let treasury = &h.system.treasury;
        let max = treasury.config().max_signers;

        for op in ops {
            let before = treasury.signer_count().unwrap();
            let result = match op {
                SignerOp::Add(i) => treasury.add_signer(&p("ops"), &signer(i)),
                SignerOp::Remove(i) => treasury.remove_signer(&p("ops"), &signer(i)),
                SignerOp::Threshold(t) => treasury.change_threshold(&p("ops"), t),
            };

            let signers = treasury.signers().unwrap();
            let threshold = treasury.threshold().unwrap();
            let unique: BTreeSet<_> = signers.iter().collect();
            prop_assert_eq!(unique.len(), signers.len());
            prop_assert!(threshold >= 1);
            prop_assert!(threshold <= signers.len());
            prop_assert!(signers.len() <= max);
            if result.is_err() {
                prop_assert_eq!(signers.len(), before);
            }
        }
    }
}
