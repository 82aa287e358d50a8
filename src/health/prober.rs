//! TCP reachability and latency probing

use crate::health::error::ProbeError;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// A single bounded-time reachability check
///
/// Implementations return the connect latency in milliseconds and must
/// not run past `timeout` by more than scheduling overhead.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> Result<f64, ProbeError>;
}

/// Probe that opens a TCP connection and closes it right away
///
/// No proxy handshake is attempted; a completed connect counts as reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

impl TcpProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, host: &str, port: u16, limit: Duration) -> Result<f64, ProbeError> {
        if host.is_empty() || port == 0 {
            return Err(ProbeError::MissingTarget);
        }

        debug!("TCP probe connecting to {}:{}", host, port);
        let start = Instant::now();

        match timeout(limit, TcpStream::connect((host, port))).await {
            Ok(Ok(mut stream)) => {
                let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
                if let Err(e) = stream.shutdown().await {
                    debug!("Closing connection to {}:{} failed: {}", host, port, e);
                }
                debug!("TCP probe to {}:{} took {:.1}ms", host, port, latency_ms);
                Ok(latency_ms)
            }
            Ok(Err(e)) => {
                debug!("TCP probe to {}:{} failed: {}", host, port, e);
                Err(ProbeError::Connect(e))
            }
            Err(_) => {
                debug!("TCP probe to {}:{} timed out after {:?}", host, port, limit);
                Err(ProbeError::Timeout)
            }
        }
    }
}
