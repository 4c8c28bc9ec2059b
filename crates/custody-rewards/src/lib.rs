//! # custody-rewards
//!
//! Template-based issuance of ledger credits from a distributor account.
//!
//! Every claim is checked, paid and recorded in one critical section:
//! template state, whitelist, per-principal claim caps and cooldowns, the
//! per-template and global daily windows, and the distributor balance. A
//! failed check leaves nothing behind.
//!
//! Daily windows are UTC calendar days. They roll lazily: the first call on
//! a new day sees an empty window, no timer involved.

#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod template;
pub mod window;

pub use config::RewardConfig;
pub use engine::RewardDistributionEngine;
pub use error::{LimitScope, RewardError};
pub use template::{ClaimRecord, Eligibility, RewardReceipt, RewardSource, RewardTemplate};
pub use window::DailyWindow;
