//! End-to-end test: guardian quorum freezes components for a bounded time.

use chrono::Duration;
use custody_pause::{HistoryAction, PauseError};
use custody_tests::{p, t0, Harness};
use custody_treasury::TreasuryAction;
use custody_types::{AuditEvent, CustodyEvent};

#[test]
fn guardian_quorum_freezes_everything_for_72_hours() {
    let h = Harness::new();
    let pause = &h.system.pause;

    let request = pause.request_pause_all(&p("g1"), "oracle incident").unwrap();
    assert!(!request.activated);
    assert!(!h.system.rewards.is_paused());

    let outcome = pause.confirm_pause(&p("g3"), request.id).unwrap();
    assert!(outcome.activated);
    assert!(h.system.treasury.is_paused());
    assert!(h.system.rewards.is_paused());
    assert!(h.system.rewards.claim("welcome_bonus", &p("user")).is_err());

    h.clock.set(t0() + Duration::hours(72) - Duration::seconds(1));
    assert!(pause.is_paused(h.system.rewards.component_id()));

    h.clock.set(t0() + Duration::hours(72));
    assert!(!pause.is_paused(h.system.rewards.component_id()));
    assert!(!h.system.treasury.is_paused());
    h.system.rewards.claim("welcome_bonus", &p("user")).unwrap();

    let expired = pause.expire_pauses().unwrap();
    assert_eq!(expired.len(), 2);
    assert!(pause
        .pause_history(10)
        .iter()
        .take(2)
        .all(|e| e.action == HistoryAction::Expired));
}

#[test]
fn manager_override_and_audit_trail() {
    let h = Harness::new();
    let pause = &h.system.pause;
    let treasury_id = h.system.treasury.component_id().clone();

    let request = pause.request_pause(&p("g2"), &treasury_id, "anomaly").unwrap();
    pause.confirm_pause(&p("g1"), request.id).unwrap();

    assert!(matches!(
        pause.unpause(&p("g1"), &treasury_id),
        Err(PauseError::Access(_))
    ));
    pause.unpause(&p("ops"), &treasury_id).unwrap();
    assert!(!h.system.treasury.is_paused());

    let trail: Vec<AuditEvent> = h.events.for_component(pause.component_id());
    assert!(trail
        .iter()
        .any(|e| matches!(e.event, CustodyEvent::PauseActivated { .. })));
    assert!(trail
        .iter()
        .any(|e| matches!(e.event, CustodyEvent::PauseLifted { .. })));

    let json = trail.last().unwrap().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["event"]["type"], "pause_lifted");
}

#[test]
fn quorum_size_bounded_by_guardian_count() {
    let h = Harness::new();
    assert!(matches!(
        h.system.pause.update_required_confirmations(&p("admin"), 4),
        Err(PauseError::InvalidConfirmations { .. })
    ));
    h.system.pause.update_required_confirmations(&p("admin"), 1).unwrap();

    let request = h
        .system
        .pause
        .request_pause(&p("g3"), h.system.rewards.component_id(), "fast path")
        .unwrap();
    assert!(request.activated);
}

#[test]
fn guardian_pause_expiry_keeps_signer_pause() {
    let h = Harness::new();
    let treasury = &h.system.treasury;
    let treasury_id = treasury.component_id().clone();

    let freeze = treasury
        .propose_action(&p("a"), TreasuryAction::Pause, "key compromise")
        .unwrap();
    treasury.confirm_transaction(&p("b"), freeze).unwrap();
    h.advance(Duration::hours(1));
    treasury.execute_transaction(&p("a"), freeze).unwrap();
    assert!(treasury.is_paused());

    let request = h.system.pause.request_pause(&p("g1"), &treasury_id, "follow-up").unwrap();
    h.system.pause.confirm_pause(&p("g2"), request.id).unwrap();

    h.advance(Duration::hours(73));
    assert!(!h.system.pause.is_paused(&treasury_id));
    assert_eq!(h.system.pause.expire_pauses().unwrap(), vec![treasury_id.clone()]);
    assert!(treasury.is_paused());

    let thaw = treasury
        .propose_action(&p("a"), TreasuryAction::Unpause, "keys rotated")
        .unwrap();
    treasury.confirm_transaction(&p("c"), thaw).unwrap();
    h.advance(Duration::hours(1));
    treasury.execute_transaction(&p("a"), thaw).unwrap();
    assert!(!treasury.is_paused());
}
