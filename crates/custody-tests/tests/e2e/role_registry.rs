//! End-to-end test: registry invariants seen through the wired system.

use custody_roles::RoleError;
use custody_tests::{p, Harness};
use custody_types::{ErrorKind, Role};

#[test]
fn sole_admin_cannot_be_removed() {
    let h = Harness::new();
    let registry = &h.system.registry;

    let err = registry.revoke_role(&p("admin"), Role::Admin, &p("admin")).unwrap_err();
    assert_eq!(err, RoleError::LastAdmin(Role::Admin));
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    assert!(registry
        .renounce_role(&p("admin"), Role::Admin, &p("admin"))
        .is_err());
    assert!(registry.has_role(Role::Admin, &p("admin")));
}

#[test]
fn admin_handover_keeps_one_admin() {
    let h = Harness::new();
    let registry = &h.system.registry;

    registry.transfer_admin(&p("admin"), &p("successor")).unwrap();
    assert!(registry.has_role(Role::Admin, &p("successor")));
    assert!(!registry.has_role(Role::Admin, &p("admin")));
    assert_eq!(registry.member_count(Role::Admin), 1);
}

#[test]
fn components_registered_at_bootstrap() {
    let h = Harness::new();
    let labels: Vec<String> = h
        .system
        .registry
        .registered_components()
        .into_iter()
        .map(|c| c.label)
        .collect();
    assert_eq!(labels, vec!["Multisig treasury", "Reward distributor"]);
}

#[test]
fn revoked_signer_admin_loses_signer_control() {
    let h = Harness::new();
    h.system.treasury.add_signer(&p("ops"), &p("d")).unwrap();
    h.system
        .registry
        .revoke_role(&p("admin"), Role::SignerAdmin, &p("ops"))
        .unwrap();
    assert_eq!(
        h.system
            .treasury
            .remove_signer(&p("ops"), &p("d"))
            .unwrap_err()
            .kind(),
        ErrorKind::Unauthorized
    );
}
