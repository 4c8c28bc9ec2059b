//! Property tests: a treasury transaction executes exactly when it holds
//! quorum inside its execution window.

use chrono::Duration;
use custody_tests::{p, t0, Harness};
use custody_types::Ledger;
use proptest::prelude::*;

const DELAY_SECS: i64 = 3_600;
const EXPIRY_SECS: i64 = 7 * 24 * 3_600;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn executes_iff_quorum_and_window(
        extra_confirmations in 0usize..=2,
        elapsed in 0i64..(8 * 24 * 3_600),
    ) {
        let h = Harness::new();
        let treasury = &h.system.treasury;
        let id = treasury
            .propose_transaction(&p("a"), p("payee"), 10, Vec::new(), "prop")
            .unwrap();
        for signer in ["b", "c"].iter().take(extra_confirmations) {
            treasury.confirm_transaction(&p(signer), id).unwrap();
        }

        h.clock.set(t0() + Duration::seconds(elapsed));
        let executed = treasury.execute_transaction(&p("a"), id).is_ok();

        let quorum = 1 + extra_confirmations >= 2;
        let in_window = (DELAY_SECS..EXPIRY_SECS).contains(&elapsed);
        prop_assert_eq!(executed, quorum && in_window);
        prop_assert_eq!(h.ledger.balance_of(&p("payee")), if executed { 10 } else { 0 });
    }
}
