//! Shared helpers for integration tests

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use v2ray_health::{CancellationToken, ProbeError, Prober};

/// Prober that always connects after a fixed delay with a fixed latency
pub struct MockProber {
    latency_ms: f64,
    delay: Duration,
    calls: AtomicUsize,
    cancel_on_call: Mutex<Option<(usize, CancellationToken)>>,
}

impl MockProber {
    pub fn new(latency_ms: f64) -> Self {
        Self {
            latency_ms,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            cancel_on_call: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Request cancellation from inside the `call`-th probe (1-based)
    pub fn cancelling_on_call(self, call: usize, token: CancellationToken) -> Self {
        *self.cancel_on_call.lock().unwrap() = Some((call, token));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for MockProber {
    async fn probe(&self, _host: &str, _port: u16, _timeout: Duration) -> Result<f64, ProbeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let trigger = self
            .cancel_on_call
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(n, _)| *n == call)
            .map(|(_, token)| token.clone());
        if let Some(token) = trigger {
            token.request();
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.latency_ms)
    }
}

/// A vmess config pointing at `host:port`
pub fn vmess_config(host: &str, port: u16) -> String {
    let payload = format!(r#"{{"v":"2","ps":"test","add":"{}","port":{},"id":"uuid"}}"#, host, port);
    format!("vmess://{}", STANDARD.encode(payload))
}
