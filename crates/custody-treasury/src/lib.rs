//! # custody-treasury
//!
//! Signer-quorum-gated, time-delayed execution of outbound value transfers.
//!
//! A transaction is proposed by a signer (whose proposal counts as the first
//! confirmation), gathers confirmations from distinct signers, and becomes
//! executable once it holds `threshold` confirmations from *current* signers
//! and at least the execution delay has passed. Seven days after creation it
//! expires. The delay is the whole defence against an under-threshold signer
//! subset: anyone watching has that window to trigger an emergency pause.
//!
//! ## Components
//!
//! - [`MultisigTreasury`]: the treasury itself, also a [`custody_types::Pausable`]
//! - [`TreasuryAction`]: outbound transfers and self-governance actions
//!   (signer set, threshold, pause) executed through the same quorum
//! - [`CallDispatcher`]: collaborator that carries out non-empty payloads
//!   and reports their resource cost
//! - [`TreasuryConfig`]: delay, expiry and ceilings

#![deny(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod treasury;
pub mod types;

mod emergency;

pub use config::TreasuryConfig;
pub use dispatch::{CallDispatcher, DispatchError, NoopDispatcher, OutboundCall};
pub use error::TreasuryError;
pub use treasury::MultisigTreasury;
pub use types::{
    EmergencyOutcome, EmergencyWithdrawal, Page, PendingAction, TransactionView, TreasuryAction,
};
