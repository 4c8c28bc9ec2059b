//! # custody-quorum
//!
//! Two-phase confirm/execute state machine, parameterized by
//! `(threshold, execution_delay, expiry)`.
//!
//! The multisig treasury instantiates it with a one hour delay and a seven
//! day expiry; the emergency pause controller with no delay and a 72 hour
//! expiry.
//!
//! ## Lifecycle
//!
//! ```text
//! Pending ──(quorum ∧ delay ≤ elapsed < expiry)──▶ Executed
//!    │
//!    ├──(elapsed ≥ expiry, observed lazily)──────▶ Expired
//!    └──(explicit cancel after expiry)───────────▶ Cancelled
//! ```
//!
//! `Executed`, `Expired` and `Cancelled` are terminal.

#![deny(unsafe_code)]

pub mod error;
pub mod policy;
pub mod proposal;

pub use error::QuorumError;
pub use policy::QuorumPolicy;
pub use proposal::{Proposal, ProposalBook, ProposalId, ProposalStatus, Readiness};
