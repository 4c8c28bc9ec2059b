use chrono::{DateTime, Utc};
use custody_quorum::{ProposalId, ProposalStatus};
use custody_types::{Amount, Principal};
use serde::{Deserialize, Serialize};

use crate::error::TreasuryError;

/// What a treasury transaction does when executed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TreasuryAction {
    /// Move `value` to `target`, then dispatch `payload` if non-empty.
    Transfer {
        target: Principal,
        value: Amount,
        payload: Vec<u8>,
    },
    AddSigner { signer: Principal },
    RemoveSigner { signer: Principal },
    ChangeThreshold { threshold: usize },
    Pause,
    Unpause,
}

impl TreasuryAction {
    /// Only lifting the pause may be proposed or executed while paused.
    pub fn allowed_while_paused(&self) -> bool {
        matches!(self, TreasuryAction::Unpause)
    }

    pub fn summary(&self) -> String {
        match self {
            TreasuryAction::Transfer {
                target,
                value,
                payload,
            } if payload.is_empty() => format!("transfer {} to {}", value, target),
            TreasuryAction::Transfer {
                target,
                value,
                payload,
            } => format!(
                "transfer {} to {} with {} byte call",
                value,
                target,
                payload.len()
            ),
            TreasuryAction::AddSigner { signer } => format!("add signer {}", signer),
            TreasuryAction::RemoveSigner { signer } => format!("remove signer {}", signer),
            TreasuryAction::ChangeThreshold { threshold } => {
                format!("change threshold to {}", threshold)
            }
            TreasuryAction::Pause => "pause treasury".to_string(),
            TreasuryAction::Unpause => "unpause treasury".to_string(),
        }
    }
}

/// Payload of a treasury proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub action: TreasuryAction,
    pub description: String,
}

/// Read model of one transaction, with lazy expiry applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionView {
    pub id: ProposalId,
    pub action: TreasuryAction,
    pub description: String,
    pub proposer: Principal,
    pub confirmations: Vec<Principal>,
    /// Confirmations from current signers
    pub confirmation_count: usize,
    pub threshold: usize,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub ready_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

/// Parameters of an emergency withdrawal round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyWithdrawal {
    pub recipient: Principal,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyOutcome {
    /// Approval recorded, still short of the threshold.
    Approved { approvals: usize, required: usize },
    /// Threshold reached; funds moved and approvals reset.
    Executed { recipient: Principal, amount: Amount },
}

/// One page of a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

impl<T: Clone> Page<T> {
    /// Slice `items` into page `page` of `page_size`. An empty listing has
    /// an empty page 0; any other page past the end is out of bounds.
    pub fn slice(items: &[T], page: usize, page_size: usize, max_page_size: usize) -> Result<Self, TreasuryError> {
        if page_size == 0 || page_size > max_page_size {
            return Err(TreasuryError::InvalidPageSize {
                size: page_size,
                max: max_page_size,
            });
        }
        let start = page.saturating_mul(page_size);
        if start >= items.len() && !(items.is_empty() && page == 0) {
            return Err(TreasuryError::PageOutOfBounds(page));
        }
        let end = start.saturating_add(page_size).min(items.len());
        Ok(Self {
            items: items[start..end].to_vec(),
            page,
            page_size,
            total: items.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_bounds() {
        let items: Vec<u32> = (0..25).collect();
        let page = Page::slice(&items, 2, 10, 100).unwrap();
        assert_eq!(page.items, vec![20, 21, 22, 23, 24]);
        assert_eq!(page.total, 25);

        assert!(matches!(
            Page::slice(&items, 3, 10, 100),
            Err(TreasuryError::PageOutOfBounds(3))
        ));
        assert!(matches!(
            Page::slice(&items, 0, 0, 100),
            Err(TreasuryError::InvalidPageSize { .. })
        ));
        assert!(matches!(
            Page::slice(&items, 0, 101, 100),
            Err(TreasuryError::InvalidPageSize { .. })
        ));

        let empty: Vec<u32> = Vec::new();
        assert!(Page::slice(&empty, 0, 10, 100).unwrap().items.is_empty());
    }

    #[test]
    fn only_unpause_allowed_while_paused() {
        assert!(TreasuryAction::Unpause.allowed_while_paused());
        assert!(!TreasuryAction::Pause.allowed_while_paused());
        assert!(!TreasuryAction::ChangeThreshold { threshold: 1 }.allowed_while_paused());
    }

    #[test]
    fn action_serializes_with_tag() {
        let json = serde_json::to_string(&TreasuryAction::AddSigner {
            signer: Principal::new("d"),
        })
        .unwrap();
        assert_eq!(json, r#"{"action":"add_signer","signer":"d"}"#);
    }
}
