//! Error types for validation, probing and batch execution
//!
//! The `Display` text of [`ValidationError`] and [`ProbeError`] is exactly
//! what ends up in a [`ServerHealth`](super::ServerHealth) record, so the
//! messages here are part of the output contract.

use std::io;
use thiserror::Error;

/// Reasons a server config fails validation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown protocol")]
    UnknownProtocol,

    #[error("Invalid vmess format")]
    Vmess,

    #[error("Invalid vless format")]
    Vless,

    #[error("Invalid trojan format")]
    Trojan,

    #[error("Invalid shadowsocks format")]
    Shadowsocks,
}

/// Reasons a TCP probe fails
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Host is empty or port is zero; no I/O was attempted
    #[error("Missing host or port")]
    MissingTarget,

    /// The connect did not complete within the probe timeout
    #[error("Connection timeout")]
    Timeout,

    /// Refused, unresolvable host, unreachable network and so on
    #[error("Connection failed: {0}")]
    Connect(#[from] io::Error),
}

/// The cancellation token fired while a batch was in flight
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("health check cancelled")]
pub struct Cancelled;

/// A per-item check that produced no record at all
///
/// The batch aggregator filters these out; they never reach the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("health check for {config} dropped: {reason}")]
pub struct Dropped {
    pub config: String,
    pub reason: String,
}

impl Dropped {
    pub fn new(config: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            config: config.into(),
            reason: reason.into(),
        }
    }
}
