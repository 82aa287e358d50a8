//! Health check data models

use crate::health::quality;
use serde::Serialize;
use std::fmt;

/// Config scheme, selected by an exact, case-sensitive prefix match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Vmess,
    Vless,
    Trojan,
    Shadowsocks,
    ShadowsocksR,
    Unknown,
}

impl Protocol {
    const KNOWN: [Protocol; 5] = [
        Protocol::Vmess,
        Protocol::Vless,
        Protocol::Trojan,
        Protocol::Shadowsocks,
        Protocol::ShadowsocksR,
    ];

    /// Detect the scheme of a config string from its prefix
    pub fn detect(config: &str) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|p| p.prefix().is_some_and(|prefix| config.starts_with(prefix)))
            .unwrap_or(Protocol::Unknown)
    }

    /// The literal prefix including `://`
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            Protocol::Vmess => Some("vmess://"),
            Protocol::Vless => Some("vless://"),
            Protocol::Trojan => Some("trojan://"),
            Protocol::Shadowsocks => Some("ss://"),
            Protocol::ShadowsocksR => Some("ssr://"),
            Protocol::Unknown => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Vmess => write!(f, "vmess"),
            Protocol::Vless => write!(f, "vless"),
            Protocol::Trojan => write!(f, "trojan"),
            Protocol::Shadowsocks => write!(f, "ss"),
            Protocol::ShadowsocksR => write!(f, "ssr"),
            Protocol::Unknown => write!(f, "unknown"),
        }
    }
}

/// A probeable connection target; `host` is non-empty and `port` is non-zero
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedTarget {
    pub host: String,
    pub port: u16,
}

impl ParsedTarget {
    /// Returns `None` unless both parts are usable
    pub fn new(host: impl Into<String>, port: u16) -> Option<Self> {
        let host = host.into();
        if host.is_empty() || port == 0 {
            return None;
        }
        Some(Self { host, port })
    }
}

impl fmt::Display for ParsedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// What a successful validation extracted from a config
///
/// Both fields are `None` for schemes that are not decoded further (ssr).
/// A vmess payload may yield a port of 0 or no host at all; that is still
/// a valid config, it just has no probeable [`ParsedTarget`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Validation {
    pub fn new(host: Option<String>, port: Option<u16>) -> Self {
        Self { host, port }
    }

    pub fn opaque() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<ParsedTarget> {
        ParsedTarget::new(self.host.clone()?, self.port?)
    }
}

/// Health classification of a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unreachable,
    Invalid,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unreachable => write!(f, "unreachable"),
            HealthStatus::Invalid => write!(f, "invalid"),
        }
    }
}

/// A config string paired with its scheme name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub config: String,
    pub protocol: String,
}

impl ServerEntry {
    pub fn new(config: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            config: config.into(),
            protocol: protocol.into(),
        }
    }

    /// Pair a config with the text before its `://`, or `"unknown"`
    pub fn from_config(config: impl Into<String>) -> Self {
        let config = config.into();
        let protocol = match config.split_once("://") {
            Some((scheme, _)) => scheme.to_ascii_lowercase(),
            None => Protocol::Unknown.to_string(),
        };
        Self { config, protocol }
    }
}

/// Result of checking one server config
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerHealth {
    pub config: String,
    pub protocol: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl ServerHealth {
    /// A config that failed validation; never probed
    pub fn invalid(entry: ServerEntry, validation_error: String) -> Self {
        Self {
            config: entry.config,
            protocol: entry.protocol,
            status: HealthStatus::Invalid,
            latency_ms: None,
            error: None,
            validation_error: Some(validation_error),
            host: None,
            port: None,
        }
    }

    /// A completed connect; status follows from the latency
    pub fn reachable(entry: ServerEntry, target: ParsedTarget, latency_ms: f64) -> Self {
        Self {
            config: entry.config,
            protocol: entry.protocol,
            status: quality::classify_latency(latency_ms),
            latency_ms: Some(latency_ms),
            error: None,
            validation_error: None,
            host: Some(target.host),
            port: Some(target.port),
        }
    }

    pub fn unreachable(entry: ServerEntry, target: ParsedTarget, error: String) -> Self {
        Self {
            config: entry.config,
            protocol: entry.protocol,
            status: HealthStatus::Unreachable,
            latency_ms: None,
            error: Some(error),
            validation_error: None,
            host: Some(target.host),
            port: Some(target.port),
        }
    }

    /// A valid config with nothing to probe, assumed healthy
    pub fn unprobed(entry: ServerEntry, validation: Validation) -> Self {
        Self {
            config: entry.config,
            protocol: entry.protocol,
            status: HealthStatus::Healthy,
            latency_ms: None,
            error: None,
            validation_error: None,
            host: validation.host,
            port: validation.port,
        }
    }

    pub fn quality_score(&self) -> f64 {
        quality::score(self.status, self.latency_ms)
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    /// The `host:port` pair when both were extracted
    pub fn address(&self) -> Option<String> {
        match (&self.host, self.port) {
            (Some(host), Some(port)) => Some(format!("{}:{}", host, port)),
            _ => None,
        }
    }

    pub fn report(&self) -> HealthReport<'_> {
        HealthReport {
            health: self,
            quality_score: self.quality_score(),
            is_healthy: self.is_healthy(),
        }
    }
}

/// Serializable view of a record including its derived fields
#[derive(Debug, Serialize)]
pub struct HealthReport<'a> {
    #[serde(flatten)]
    pub health: &'a ServerHealth,
    pub quality_score: f64,
    pub is_healthy: bool,
}
