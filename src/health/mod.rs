//! Health module for validating and checking server configs
//!
//! This module provides functionality for:
//! - Validating vmess, vless, trojan, ss and ssr configs and extracting their target
//! - Probing TCP reachability and latency under a shared concurrency limit
//! - Scoring, filtering and ranking servers by quality
//! - Running large lists in batches that can be stopped cooperatively

pub mod cancel;
pub mod checker;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod prober;
pub mod quality;
pub mod source;
pub mod validator;

pub use cancel::CancellationToken;
pub use checker::{CheckerConfig, HealthChecker};
pub use error::{Cancelled, Dropped, ProbeError, ValidationError};
pub use models::{
    HealthReport, HealthStatus, ParsedTarget, Protocol, ServerEntry, ServerHealth, Validation,
};
pub use pipeline::{BatchedHealthPipeline, HealthSummary, PipelineConfig, PipelineOutcome};
pub use prober::{Prober, TcpProber};
pub use quality::{filter_healthy_servers, sort_by_quality};
pub use source::ConfigList;
pub use validator::ConfigValidator;
