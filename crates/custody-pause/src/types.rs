use chrono::{DateTime, Utc};
use custody_quorum::{ProposalId, ProposalStatus};
use custody_types::{ComponentId, PauseKind, Principal};
use serde::{Deserialize, Serialize};

/// What a guardian request asks for once it reaches quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseAction {
    pub kind: PauseKind,
    pub targets: Vec<ComponentId>,
    pub reason: String,
}

/// A pause in force on one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePause {
    pub request: ProposalId,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

/// Result of opening or confirming a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub id: ProposalId,
    pub confirmations: usize,
    pub required: usize,
    /// Whether this call brought the request to quorum and applied it
    pub activated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseRequestView {
    pub id: ProposalId,
    pub kind: PauseKind,
    pub targets: Vec<ComponentId>,
    pub reason: String,
    pub proposer: Principal,
    /// Confirmations from principals that are still guardians
    pub confirmations: usize,
    pub required: usize,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ProposalStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub component: ComponentId,
    pub paused: bool,
    pub paused_until: Option<DateTime<Utc>>,
    pub request: Option<ProposalId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HistoryAction {
    Paused { until: DateTime<Utc> },
    Lifted { by: Principal },
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseHistoryEntry {
    pub component: ComponentId,
    pub request: Option<ProposalId>,
    pub action: HistoryAction,
    pub at: DateTime<Utc>,
}
