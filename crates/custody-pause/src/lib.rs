//! # custody-pause
//!
//! Guardian-quorum emergency pause over every registered component.
//!
//! A guardian requests a pause (their request is the first confirmation);
//! once `required_confirmations` current guardians have confirmed, every
//! target is frozen at once. A pause lapses by itself 72 hours after the
//! request was opened, or earlier when a manager lifts it or a guardian
//! quorum approves an unpause request.
//!
//! ## Components
//!
//! - [`EmergencyPauseController`]: tracks pausable components and runs the
//!   request/confirm/activate cycle
//! - [`PauseConfig`]: quorum size, pause duration and guardian floor
//! - [`PauseRequestView`], [`ComponentStatus`], [`PauseHistoryEntry`]: read
//!   models

#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod error;
pub mod types;

pub use config::PauseConfig;
pub use controller::EmergencyPauseController;
pub use error::PauseError;
pub use types::{
    ActivePause, ComponentStatus, HistoryAction, PauseAction, PauseHistoryEntry, PauseRequestView,
    RequestOutcome,
};
