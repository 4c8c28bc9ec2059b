//! Property tests: an activated pause holds until exactly 72 hours after
//! the request and not a second longer.

use chrono::Duration;
use custody_tests::{p, t0, Harness};
use proptest::prelude::*;

const MAX_PAUSE_SECS: i64 = 72 * 3_600;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pause_lapses_at_request_plus_72h(
        confirm_after in 0i64..MAX_PAUSE_SECS,
        observe_at in 0i64..(2 * MAX_PAUSE_SECS),
    ) {
        let h = Harness::new();
        let pause = &h.system.pause;
        let target = h.system.treasury.component_id().clone();

        let request = pause.request_pause(&p("g1"), &target, "drill").unwrap();
        h.clock.set(t0() + Duration::seconds(confirm_after));
        prop_assert!(pause.confirm_pause(&p("g2"), request.id).unwrap().activated);

        let observed = confirm_after.max(observe_at);
        h.clock.set(t0() + Duration::seconds(observed));
        let expected = observed < MAX_PAUSE_SECS;
        prop_assert_eq!(pause.is_paused(&target), expected);
        prop_assert_eq!(h.system.treasury.is_paused(), expected);
    }
}
