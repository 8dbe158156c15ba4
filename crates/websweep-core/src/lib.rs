//! websweep-core: Shared types, scan configuration, and error handling for websweep.
//!
//! This crate provides the foundational types used by the scanning engine:
//! - Network prefixes and the targets derived from them
//! - Probe protocols and probe outcomes
//! - The validated, read-only scan configuration
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::ScanConfig;
pub use error::{Result, SweepError};
pub use types::{NetworkPrefix, ProbeOutcome, Protocol, ScanTarget};
