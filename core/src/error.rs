use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    #[error("line {line}: not an IP address or CIDR: {value:?}")]
    InvalidTarget { line: usize, value: String },
    #[error("line {line}: CIDR block {value} is larger than /16 (IPv4) or /112 (IPv6)")]
    TooManyTargets { line: usize, value: String },
    #[error("duplicate scan profile name: {0}")]
    DuplicateProfile(String),
    #[error("scan profile {0:?} has no arguments")]
    EmptyProfile(String),
    #[error("no scan profiles configured")]
    EmptyProfileSet,
    #[error("failed to launch {tool}: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed report {path}: {reason}")]
    MalformedReport { path: PathBuf, reason: String },
}
