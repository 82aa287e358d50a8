//! Health checker for validating and probing server configs concurrently

use crate::health::cancel::CancellationToken;
use crate::health::error::{Cancelled, Dropped};
use crate::health::models::{ParsedTarget, ServerEntry, ServerHealth};
use crate::health::prober::{Prober, TcpProber};
use crate::health::validator::ConfigValidator;
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tracing::{debug, error};

/// Default timeout for each TCP probe in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default number of probes in flight at once
const DEFAULT_CONCURRENCY: usize = 50;

/// Configuration for the health checker
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerConfig {
    /// Timeout for each probe
    pub timeout: Duration,
    /// Maximum number of simultaneous probes
    pub concurrency: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// A limit of zero would never admit a probe, so it is raised to one
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// What to do with an entry once it has been validated
enum Plan {
    Done(ServerHealth),
    Probe(ServerEntry, ParsedTarget),
}

/// Health checker for server configs
///
/// Owns the concurrency limiter, so every batch run through the same
/// checker shares one pool of probe slots.
#[derive(Clone)]
pub struct HealthChecker {
    config: CheckerConfig,
    prober: Arc<dyn Prober>,
    limiter: Arc<Semaphore>,
}

impl HealthChecker {
    /// Create a TCP health checker with default configuration
    pub fn new() -> Self {
        Self::with_config(CheckerConfig::default())
    }

    /// Create a TCP health checker with custom configuration
    pub fn with_config(config: CheckerConfig) -> Self {
        Self::with_prober(config, Arc::new(TcpProber::new()))
    }

    /// Create a health checker around any prober
    pub fn with_prober(config: CheckerConfig, prober: Arc<dyn Prober>) -> Self {
        let limiter = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            config,
            prober,
            limiter,
        }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Check a single server: validate, then probe when there is a target
    ///
    /// Does not take a limiter slot.
    pub async fn check_server(&self, entry: ServerEntry) -> ServerHealth {
        match Self::plan(entry) {
            Plan::Done(record) => record,
            Plan::Probe(entry, target) => {
                probe_target(self.prober.as_ref(), entry, target, self.config.timeout).await
            }
        }
    }

    /// Check a batch of servers concurrently
    ///
    /// Validation runs inline; probes run as separate tasks gated by the
    /// limiter. Results come back in completion order. A task that panics
    /// yields no record at all. If `cancel` fires before every task has
    /// finished, outstanding probes are aborted and the batch is discarded.
    pub async fn check_batch(
        &self,
        entries: Vec<ServerEntry>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ServerHealth>, Cancelled> {
        let mut outcomes: Vec<Result<ServerHealth, Dropped>> = Vec::with_capacity(entries.len());
        let mut aborts = Vec::new();
        let mut pending = FuturesUnordered::new();

        for entry in entries {
            match Self::plan(entry) {
                Plan::Done(record) => outcomes.push(Ok(record)),
                Plan::Probe(entry, target) => {
                    let (abort, task) = self.spawn_probe(entry, target);
                    aborts.push(abort);
                    pending.push(task);
                }
            }
        }
        debug!(
            "Batch of {} servers: {} probes scheduled",
            outcomes.len() + pending.len(),
            pending.len()
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    for abort in &aborts {
                        abort.abort();
                    }
                    debug!("Batch cancelled with {} probes outstanding", pending.len());
                    return Err(Cancelled);
                }
                next = pending.next() => match next {
                    Some(outcome) => outcomes.push(outcome),
                    None => break,
                },
            }
        }

        Ok(collect_records(outcomes))
    }

    /// Check servers without a way to cancel
    pub async fn check_servers(&self, entries: Vec<ServerEntry>) -> Vec<ServerHealth> {
        let never = CancellationToken::new();
        self.check_batch(entries, &never).await.unwrap_or_default()
    }

    fn plan(entry: ServerEntry) -> Plan {
        match ConfigValidator::validate(&entry.config) {
            Err(e) => Plan::Done(ServerHealth::invalid(entry, e.to_string())),
            Ok(validation) => match validation.target() {
                Some(target) => Plan::Probe(entry, target),
                None => Plan::Done(ServerHealth::unprobed(entry, validation)),
            },
        }
    }

    fn spawn_probe(
        &self,
        entry: ServerEntry,
        target: ParsedTarget,
    ) -> (AbortHandle, impl Future<Output = Result<ServerHealth, Dropped>>) {
        let config = entry.config.clone();
        let limiter = Arc::clone(&self.limiter);
        let prober = Arc::clone(&self.prober);
        let timeout = self.config.timeout;

        let handle = tokio::spawn(async move {
            let _permit = match limiter.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Err(Dropped::new(entry.config, "concurrency limiter closed")),
            };
            Ok(probe_target(prober.as_ref(), entry, target, timeout).await)
        });

        let abort = handle.abort_handle();
        let joined = async move {
            handle
                .await
                .unwrap_or_else(|e| Err(Dropped::new(config, e.to_string())))
        };
        (abort, joined)
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

async fn probe_target(
    prober: &dyn Prober,
    entry: ServerEntry,
    target: ParsedTarget,
    timeout: Duration,
) -> ServerHealth {
    match prober.probe(&target.host, target.port, timeout).await {
        Ok(latency_ms) => ServerHealth::reachable(entry, target, latency_ms),
        Err(e) => ServerHealth::unreachable(entry, target, e.to_string()),
    }
}

/// Keep produced records, log and discard dropped items
fn collect_records(outcomes: Vec<Result<ServerHealth, Dropped>>) -> Vec<ServerHealth> {
    outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            Ok(record) => Some(record),
            Err(dropped) => {
                error!("Health check failed: {}", dropped);
                None
            }
        })
        .collect()
}
