//! # custody-runtime
//!
//! Assembles a running custody core from configuration.
//!
//! ## Components
//!
//! - [`CustodyConfig`]: one document covering logging, treasury, rewards and
//!   the pause controller; loaded from defaults, an optional file and
//!   `CUSTODY_*` environment overrides
//! - [`init_tracing`]: installs the global `tracing` subscriber
//! - [`CustodySystem`]: the wired registry, treasury, reward engine and
//!   pause controller, bootstrapped from a [`Genesis`]

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod system;
pub mod telemetry;

pub use config::{CustodyConfig, LoggingConfig};
pub use error::ConfigError;
pub use system::{CustodySystem, Genesis};
pub use telemetry::init_tracing;
