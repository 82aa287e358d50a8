//! Config validator for V2Ray-style server URIs
//!
//! Supports formats:
//! - `vmess://BASE64(JSON)` with `add`/`address` and `port` fields
//! - `vless://UUID@HOST:PORT?params`
//! - `trojan://PASSWORD@HOST:PORT?params`
//! - `ss://USERINFO@HOST:PORT` or `ss://BASE64(METHOD:PASSWORD@HOST:PORT)`
//! - `ssr://...`, accepted without decoding

use crate::health::error::ValidationError;
use crate::health::models::{Protocol, Validation};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tracing::debug;

/// Validates server configs and extracts their connection target
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a config string
    ///
    /// Surrounding whitespace is ignored. Dispatch is by exact prefix, so
    /// `VMESS://` is an unknown protocol.
    pub fn validate(config: &str) -> Result<Validation, ValidationError> {
        let config = config.trim();
        let protocol = Protocol::detect(config);
        let payload = match protocol.prefix() {
            Some(prefix) => &config[prefix.len()..],
            None => return Err(ValidationError::UnknownProtocol),
        };

        match protocol {
            Protocol::Vmess => Self::parse_vmess(payload).ok_or(ValidationError::Vmess),
            Protocol::Vless => Self::parse_at_host_port(payload).ok_or(ValidationError::Vless),
            Protocol::Trojan => Self::parse_at_host_port(payload).ok_or(ValidationError::Trojan),
            Protocol::Shadowsocks => {
                Self::parse_shadowsocks(payload).ok_or(ValidationError::Shadowsocks)
            }
            Protocol::ShadowsocksR => Ok(Validation::opaque()),
            Protocol::Unknown => Err(ValidationError::UnknownProtocol),
        }
    }

    /// Decode a vmess payload
    ///
    /// Missing `=` padding is restored before decoding. A missing `port`
    /// field means port 0, which is valid but leaves nothing to probe.
    fn parse_vmess(payload: &str) -> Option<Validation> {
        let mut encoded = payload.to_string();
        let remainder = encoded.len() % 4;
        if remainder != 0 {
            encoded.push_str(&"=".repeat(4 - remainder));
        }

        let decoded = match STANDARD.decode(encoded.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Failed to decode vmess base64: {}", e);
                return None;
            }
        };
        let data: Value = match serde_json::from_slice(&decoded) {
            Ok(value) => value,
            Err(e) => {
                debug!("Failed to decode vmess json: {}", e);
                return None;
            }
        };
        let fields = data.as_object()?;

        let host = non_empty_str(fields.get("add")).or_else(|| non_empty_str(fields.get("address")));
        let port = match fields.get("port") {
            Some(value) => json_port(value)?,
            None => 0,
        };

        Some(Validation::new(host, Some(port)))
    }

    /// Parse `USERINFO@HOST:PORT?params`, used by vless and trojan
    fn parse_at_host_port(payload: &str) -> Option<Validation> {
        let after_at = payload.split('@').nth(1)?;
        let address = after_at.split('?').next()?;

        let parts: Vec<&str> = address.split(':').collect();
        if parts.len() != 2 {
            debug!("Expected HOST:PORT, got {:?}", address);
            return None;
        }

        let port = parse_port(parts[1])?;
        Some(Validation::new(Some(parts[0].to_string()), Some(port)))
    }

    /// Parse a shadowsocks payload, falling back to a fully base64 encoded form
    fn parse_shadowsocks(payload: &str) -> Option<Validation> {
        let decoded;
        let source = if payload.contains('@') {
            payload
        } else {
            decoded = STANDARD
                .decode(payload.as_bytes())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())?;
            if !decoded.contains('@') {
                debug!("Decoded shadowsocks payload has no host part");
                return None;
            }
            decoded.as_str()
        };

        let after_at = source.split('@').nth(1)?;
        let mut parts = after_at.split(':');
        let host = parts.next()?;
        let port = parse_port(parts.next()?)?;

        Some(Validation::new(Some(host.to_string()), Some(port)))
    }
}

fn parse_port(s: &str) -> Option<u16> {
    s.trim().parse().ok()
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// vmess generators write the port either as a number or a string
fn json_port(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(port) => u16::try_from(port).ok(),
            None => n
                .as_f64()
                .filter(|f| *f >= 0.0 && *f < 65536.0)
                .map(|f| f.trunc() as u16),
        },
        Value::String(s) => parse_port(s),
        _ => None,
    }
}
