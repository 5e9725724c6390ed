//! Core utilities and shared types for the recon orchestrator.

pub mod error;
mod models;
pub mod pacing;
pub mod profile;
pub mod targets;

pub use error::ReconError;
pub use models::{ExploitLookupResult, QueryKind, ScanResult, VulnFinding};
pub use profile::{ProfileSet, ScanMode, ScanProfile, Tier};
pub use targets::{load_targets, parse_targets};

use std::fmt;
use std::net::IpAddr;

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// A single scan target read from the input list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target(pub IpAddr);

impl From<IpAddr> for Target {
    fn from(ip: IpAddr) -> Self {
        Target(ip)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
