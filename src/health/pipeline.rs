//! Batched health checking with early stop, filtering and ranking

use crate::health::cancel::CancellationToken;
use crate::health::checker::{CheckerConfig, HealthChecker};
use crate::health::error::Cancelled;
use crate::health::models::{HealthStatus, ServerEntry, ServerHealth};
use crate::health::quality::{filter_healthy_servers, sort_by_quality};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Default number of servers checked per batch
const DEFAULT_BATCH_SIZE: usize = 50;

/// Configuration for a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Probe timeout and concurrency
    pub checker: CheckerConfig,
    /// Servers per batch; cancellation is checked between batches
    pub batch_size: usize,
    /// Records scoring below this are dropped
    pub min_quality_score: f64,
    /// Drop unreachable records as well as invalid ones
    pub exclude_unreachable: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            checker: CheckerConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            min_quality_score: 0.0,
            exclude_unreachable: false,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checker(mut self, checker: CheckerConfig) -> Self {
        self.checker = checker;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.checker = self.checker.with_timeout(timeout);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.checker = self.checker.with_concurrency(concurrency);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Negative or non-finite thresholds mean no threshold
    pub fn with_min_quality_score(mut self, score: f64) -> Self {
        self.min_quality_score = if score.is_finite() && score > 0.0 {
            score
        } else {
            0.0
        };
        self
    }

    pub fn with_exclude_unreachable(mut self, exclude: bool) -> Self {
        self.exclude_unreachable = exclude;
        self
    }
}

/// Counts over every record produced before filtering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSummary {
    /// Servers handed to the run
    pub total: usize,
    /// Records produced by completed batches
    pub checked: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub unreachable: usize,
    pub invalid: usize,
    pub batches_run: usize,
    pub batches_total: usize,
    /// The run ended before all batches completed
    pub stopped_early: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl HealthSummary {
    fn tally(&mut self, records: &[ServerHealth]) {
        for record in records {
            match record.status {
                HealthStatus::Healthy => self.healthy += 1,
                HealthStatus::Degraded => self.degraded += 1,
                HealthStatus::Unreachable => self.unreachable += 1,
                HealthStatus::Invalid => self.invalid += 1,
            }
        }
        self.checked += records.len();
    }
}

/// Filtered, ranked records plus how the run went
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Sorted by quality score, best first
    pub records: Vec<ServerHealth>,
    pub summary: HealthSummary,
}

impl PipelineOutcome {
    pub fn stopped_early(&self) -> bool {
        self.summary.stopped_early
    }
}

/// Runs a health checker over a server list one batch at a time
pub struct BatchedHealthPipeline {
    checker: HealthChecker,
    config: PipelineConfig,
}

impl BatchedHealthPipeline {
    /// Create a pipeline that probes over TCP
    pub fn new(config: PipelineConfig) -> Self {
        let checker = HealthChecker::with_config(config.checker.clone());
        Self::with_checker(config, checker)
    }

    /// Create a pipeline around an existing checker
    ///
    /// The checker's own configuration decides timeout and concurrency.
    pub fn with_checker(config: PipelineConfig, checker: HealthChecker) -> Self {
        Self { checker, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Check `servers` batch by batch
    ///
    /// `cancel` is checked before each batch and watched while a batch is
    /// in flight. A batch interrupted by cancellation contributes nothing;
    /// results from earlier batches are kept, filtered and ranked as usual.
    /// The token is left set so the caller can tell the run stopped early.
    pub async fn run<I, S>(&self, servers: I, cancel: &CancellationToken) -> PipelineOutcome
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<ServerEntry> = servers.into_iter().map(ServerEntry::from_config).collect();
        let batch_size = self.config.batch_size.max(1);

        let mut summary = HealthSummary {
            total: entries.len(),
            checked: 0,
            healthy: 0,
            degraded: 0,
            unreachable: 0,
            invalid: 0,
            batches_run: 0,
            batches_total: entries.len().div_ceil(batch_size),
            stopped_early: false,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };

        info!(
            "Checking health of {} servers (batch_size={})...",
            summary.total, batch_size
        );

        let mut accumulated: Vec<ServerHealth> = Vec::with_capacity(entries.len());
        for (index, chunk) in entries.chunks(batch_size).enumerate() {
            if cancel.is_requested() {
                info!(
                    "Health check stopped by user after {} servers (batch {}/{})",
                    accumulated.len(),
                    index + 1,
                    summary.batches_total
                );
                break;
            }

            match self.checker.check_batch(chunk.to_vec(), cancel).await {
                Ok(records) => {
                    summary.tally(&records);
                    summary.batches_run += 1;
                    accumulated.extend(records);
                }
                Err(Cancelled) => {
                    info!(
                        "Health check interrupted after {} servers",
                        accumulated.len()
                    );
                    cancel.request();
                    break;
                }
            }
        }

        summary.stopped_early = cancel.is_requested();
        summary.finished_at = Utc::now();

        let filtered = filter_healthy_servers(
            accumulated,
            self.config.min_quality_score,
            self.config.exclude_unreachable,
        );
        let records = sort_by_quality(filtered, true);

        info!(
            "Health check finished: {} checked, {} healthy, {} degraded, {} unreachable, {} invalid, {} kept",
            summary.checked,
            summary.healthy,
            summary.degraded,
            summary.unreachable,
            summary.invalid,
            records.len()
        );

        PipelineOutcome { records, summary }
    }
}
