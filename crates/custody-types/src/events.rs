//! Audit events.
//!
//! Every state-changing operation emits exactly one [`AuditEvent`] per
//! observable change. No-op calls (granting a held role, re-whitelisting)
//! emit nothing.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::identity::{ComponentId, Principal, Role};
use crate::ledger::Amount;

/// Direction of a guardian pause request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauseKind {
    Pause,
    Unpause,
}

/// What changed. Variants carry the old and new values where a value was
/// replaced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CustodyEvent {
    // --- Role registry ---
    RoleGranted {
        role: Role,
        principal: Principal,
        by: Principal,
    },
    RoleRevoked {
        role: Role,
        principal: Principal,
        by: Principal,
    },
    RoleAdminChanged {
        role: Role,
        previous: Role,
        new: Role,
    },
    ComponentRegistered {
        component: ComponentId,
        label: String,
    },
    ComponentDeregistered {
        component: ComponentId,
    },

    // --- Treasury ---
    TransactionProposed {
        id: u64,
        proposer: Principal,
        summary: String,
    },
    TransactionConfirmed {
        id: u64,
        signer: Principal,
        confirmations: usize,
    },
    ConfirmationRevoked {
        id: u64,
        signer: Principal,
        confirmations: usize,
    },
    TransactionExecuted {
        id: u64,
        executor: Principal,
    },
    TransactionCancelled {
        id: u64,
    },
    TransactionFailed {
        id: u64,
        reason: String,
    },
    SignerAdded {
        signer: Principal,
        signer_count: usize,
    },
    SignerRemoved {
        signer: Principal,
        signer_count: usize,
    },
    ThresholdChanged {
        previous: usize,
        new: usize,
    },
    Deposit {
        from: Principal,
        amount: Amount,
        balance: Amount,
    },
    EmergencyApproval {
        signer: Principal,
        recipient: Principal,
        amount: Amount,
        approvals: usize,
    },
    EmergencyWithdrawal {
        recipient: Principal,
        amount: Amount,
    },

    // --- Pause switches ---
    Paused {
        by: Principal,
        until: Option<DateTime<Utc>>,
    },
    Unpaused {
        by: Principal,
    },

    // --- Rewards ---
    RewardClaimed {
        template: String,
        principal: Principal,
        amount: Amount,
        issued_today: Amount,
    },
    CustomRewardIssued {
        principal: Principal,
        amount: Amount,
        reason: String,
        by: Principal,
    },
    ReferralRewarded {
        referee: Principal,
        referrer: Principal,
        amount: Amount,
    },
    TemplateUpserted {
        template: String,
        previous_amount: Option<Amount>,
        new_amount: Amount,
        active: bool,
    },
    TemplateActivation {
        template: String,
        previous: bool,
        new: bool,
    },
    WhitelistChanged {
        principal: Principal,
        whitelisted: bool,
    },
    TreasurySwept {
        recipient: Principal,
        amount: Amount,
    },

    // --- Emergency pause controller ---
    ComponentTracked {
        component: ComponentId,
    },
    ComponentUntracked {
        component: ComponentId,
    },
    PauseRequested {
        id: u64,
        kind: PauseKind,
        targets: Vec<ComponentId>,
        proposer: Principal,
        reason: String,
    },
    PauseConfirmed {
        id: u64,
        guardian: Principal,
        confirmations: usize,
    },
    PauseActivated {
        id: u64,
        targets: Vec<ComponentId>,
        expires_at: DateTime<Utc>,
    },
    PauseLifted {
        target: ComponentId,
        by: Principal,
    },
    PauseExpired {
        target: ComponentId,
    },
    RequiredConfirmationsChanged {
        previous: usize,
        new: usize,
    },
}

/// An emitted event, stamped with an id, the emitting component and time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub component: ComponentId,
    pub recorded_at: DateTime<Utc>,
    pub event: CustodyEvent,
}

impl AuditEvent {
    pub fn new(component: ComponentId, recorded_at: DateTime<Utc>, event: CustodyEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            component,
            recorded_at,
            event,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Receiver of audit events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// In-memory sink, mostly for tests and inspection tooling.
#[derive(Debug, Default)]
pub struct EventLog {
    events: RwLock<Vec<AuditEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events emitted by one component, oldest first.
    pub fn for_component(&self, component: &ComponentId) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| &e.component == component)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: AuditEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
        }
    }
}

/// Sink that writes each event to the `custody::audit` tracing target as JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: AuditEvent) {
        let payload = event
            .to_json()
            .unwrap_or_else(|e| format!("{{\"serialization_error\":\"{}\"}}", e));
        info!(
            target: "custody::audit",
            event_id = %event.event_id,
            component = %event.component,
            payload = %payload,
            "Audit event"
        );
    }
}
