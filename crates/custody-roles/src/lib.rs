//! # custody-roles
//!
//! The single authorization authority of the custody core.
//!
//! Components never keep their own role tables. They hold an
//! `Arc<dyn AccessControl>` and ask it before every privileged mutation.
//!
//! ## Components
//!
//! - [`RoleRegistry`]: principal → role grants, per-role administering roles,
//!   component registration, last-admin protection
//! - [`AccessControl`]: the capability-check interface injected into the
//!   treasury, reward engine and pause controller
//! - [`CustodyContext`]: access control bundled with the ledger, clock and
//!   event sink every component is constructed with

#![deny(unsafe_code)]

pub mod access;
pub mod context;
pub mod error;
pub mod registry;

pub use access::AccessControl;
pub use context::CustodyContext;
pub use error::RoleError;
pub use registry::{RegisteredComponent, RoleRegistry};
