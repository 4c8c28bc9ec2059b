//! # custody-types
//!
//! Shared vocabulary for the custody core. Every component crate
//! (roles, treasury, rewards, pause) speaks in these types.
//!
//! ## Components
//!
//! - **Identity**: [`Principal`], [`Role`], [`ComponentId`]
//! - **Value**: [`Amount`], the [`Ledger`] collaborator trait and an
//!   [`InMemoryLedger`] implementation
//! - **Time**: the [`Clock`] trait with [`SystemClock`] and the test-oriented
//!   [`ManualClock`]
//! - **Audit**: [`AuditEvent`] records carrying old/new deltas, delivered to an
//!   [`EventSink`]
//! - **Pausing**: the [`PauseSwitch`] state cell and the [`Pausable`] trait the
//!   emergency controller drives
//! - **Errors**: the shared [`ErrorKind`] taxonomy every crate error maps onto

#![deny(unsafe_code)]

pub mod clock;
pub mod error;
pub mod events;
pub mod identity;
pub mod ledger;
pub mod pause;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, LedgerError, SwitchError};
pub use events::{AuditEvent, CustodyEvent, EventLog, EventSink, PauseKind, TracingSink};
pub use identity::{ComponentId, Principal, Role};
pub use ledger::{Amount, InMemoryLedger, Ledger};
pub use pause::{Pausable, PauseEngagement, PauseSwitch};
