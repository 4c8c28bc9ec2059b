//! End-to-end test: treasury proposals through quorum, delay and expiry.

use chrono::Duration;
use custody_quorum::ProposalStatus;
use custody_tests::{p, Harness, TREASURY_FUNDS};
use custody_treasury::{EmergencyOutcome, TreasuryAction, TreasuryError};
use custody_types::{ErrorKind, Ledger};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn two_of_three_transfer_after_delay() {
    let h = Harness::new();
    let treasury = &h.system.treasury;

    let id = treasury
        .propose_transaction(&p("a"), p("supplier"), 100, Vec::new(), "invoice 42")
        .unwrap();
    assert_eq!(treasury.confirmation_count(id).unwrap(), 1);

    // one confirmation short
    let err = treasury.execute_transaction(&p("a"), id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    assert_eq!(treasury.confirm_transaction(&p("b"), id).unwrap(), 2);

    // quorum reached but delay not elapsed
    h.advance(Duration::minutes(59));
    assert!(treasury.execute_transaction(&p("c"), id).is_err());

    h.advance(Duration::minutes(1));
    treasury.execute_transaction(&p("c"), id).unwrap();
    assert_eq!(h.ledger.balance_of(&p("supplier")), 100);
    assert_eq!(treasury.balance(), TREASURY_FUNDS - 100);
    assert_eq!(treasury.transaction_status(id).unwrap(), ProposalStatus::Executed);

    let again = treasury.execute_transaction(&p("a"), id).unwrap_err();
    assert!(matches!(again, TreasuryError::Quorum(_)));
    assert_eq!(h.ledger.balance_of(&p("supplier")), 100);
}

#[test]
fn outsiders_cannot_propose_or_confirm() {
    let h = Harness::new();
    let treasury = &h.system.treasury;
    assert!(matches!(
        treasury.propose_transaction(&p("mallory"), p("mallory"), 1, Vec::new(), "x"),
        Err(TreasuryError::NotSigner(_))
    ));
    let id = treasury
        .propose_transaction(&p("a"), p("supplier"), 1, Vec::new(), "x")
        .unwrap();
    assert_eq!(
        treasury.confirm_transaction(&p("mallory"), id).unwrap_err().kind(),
        ErrorKind::Unauthorized
    );
}

#[test]
fn proposal_expires_after_seven_days() {
    let h = Harness::new();
    let treasury = &h.system.treasury;
    let id = treasury
        .propose_transaction(&p("a"), p("supplier"), 100, Vec::new(), "stale")
        .unwrap();
    treasury.confirm_transaction(&p("b"), id).unwrap();

    h.advance(Duration::days(7));
    assert!(treasury.is_expired(id).unwrap());
    assert!(treasury.execute_transaction(&p("a"), id).is_err());
    treasury.cancel_expired(&p("a"), id).unwrap();
    assert_eq!(treasury.transaction_status(id).unwrap(), ProposalStatus::Cancelled);
    assert_eq!(treasury.balance(), TREASURY_FUNDS);
}

#[test]
fn governance_actions_run_through_quorum() {
    let h = Harness::new();
    let treasury = &h.system.treasury;

    let id = treasury
        .propose_action(&p("a"), TreasuryAction::AddSigner { signer: p("d") }, "onboard d")
        .unwrap();
    treasury.confirm_transaction(&p("c"), id).unwrap();
    h.advance(Duration::hours(1));
    treasury.execute_transaction(&p("b"), id).unwrap();
    assert!(treasury.is_signer(&p("d")));

    let id = treasury
        .propose_action(&p("d"), TreasuryAction::ChangeThreshold { threshold: 3 }, "tighten")
        .unwrap();
    treasury.confirm_transaction(&p("a"), id).unwrap();
    h.advance(Duration::hours(1));
    treasury.execute_transaction(&p("d"), id).unwrap();
    assert_eq!(treasury.threshold().unwrap(), 3);
}

#[test]
fn emergency_withdrawal_while_paused() {
    let h = Harness::new();
    let treasury = &h.system.treasury;
    let pause = &h.system.pause;

    assert!(matches!(
        treasury.emergency_withdraw(&p("a"), &p("cold"), 1_000),
        Err(TreasuryError::NotPaused)
    ));

    let request = pause
        .request_pause(&p("g1"), treasury.component_id(), "key compromise")
        .unwrap();
    pause.confirm_pause(&p("g2"), request.id).unwrap();
    assert!(treasury.is_paused());

    // ordinary transfers are frozen
    assert!(matches!(
        treasury.propose_transaction(&p("a"), p("supplier"), 1, Vec::new(), "x"),
        Err(TreasuryError::Paused)
    ));

    assert!(matches!(
        treasury.emergency_withdraw(&p("a"), &p("cold"), TREASURY_FUNDS / 2 + 1),
        Err(TreasuryError::EmergencyLimitExceeded { .. })
    ));
    assert!(matches!(
        treasury.emergency_withdraw(&p("a"), &p("cold"), 4_000).unwrap(),
        EmergencyOutcome::Approved { approvals: 1, required: 2 }
    ));
    assert!(matches!(
        treasury.emergency_withdraw(&p("b"), &p("cold"), 4_000).unwrap(),
        EmergencyOutcome::Executed { amount: 4_000, .. }
    ));
    assert_eq!(h.ledger.balance_of(&p("cold")), 4_000);
    assert_eq!(treasury.emergency_approvals().unwrap(), 0);
}
