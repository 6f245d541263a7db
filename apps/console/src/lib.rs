//! Tees Console
//!
//! Operator console for the runtime control plane of the Tees storefront:
//! rate limiting and security header overrides, metrics, health, request
//! tracing, the audit trail and session revocation.
//!
//! The building blocks are usable without the CLI:
//! - [`draft::ConfigDraft`]: dirty-tracked editing of a config section
//! - [`audit::AuditViewer`]: filtered, paginated audit browsing with tail mode
//! - [`monitor`]: metrics overview, health, tracing and config views
//! - [`schedule::PollHandle`]: cancellable periodic task

#![allow(clippy::module_name_repetitions)]

pub mod audit;
pub mod cli;
pub mod commands;
pub mod config;
pub mod draft;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod schedule;
pub mod sessions;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
