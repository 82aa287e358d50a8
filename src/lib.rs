//! V2Ray Health - Server Config Validator and Health Checker
//!
//! Validates V2Ray-style server configs (vmess, vless, trojan, ss, ssr),
//! probes their TCP reachability and latency concurrently, and ranks
//! them by a quality score. Large lists are checked in batches so a run
//! can be stopped early without losing the results gathered so far.

pub mod health;

pub use health::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Initialize tracing to stderr
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    Ok(())
}
