//! End-to-end checks of the health pipeline through the public API

mod common;

use common::{vmess_config, MockProber};
use std::sync::Arc;
use std::time::{Duration, Instant};
use v2ray_health::{
    BatchedHealthPipeline, CancellationToken, CheckerConfig, HealthChecker, HealthStatus,
    PipelineConfig, ServerEntry,
};

fn pipeline(config: PipelineConfig, prober: Arc<MockProber>) -> BatchedHealthPipeline {
    let checker = HealthChecker::with_prober(config.checker.clone(), prober);
    BatchedHealthPipeline::with_checker(config, checker)
}

#[tokio::test]
async fn test_check_batch_mixed_configs() {
    let prober = Arc::new(MockProber::new(50.0));
    let checker = HealthChecker::with_prober(CheckerConfig::default(), prober.clone());
    let entries = vec![
        ServerEntry::from_config(vmess_config("a", 1)),
        ServerEntry::from_config("not_a_config"),
        ServerEntry::from_config("vless://u@b:2"),
    ];

    let records = checker
        .check_batch(entries, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(records.len(), 3);

    let invalid: Vec<_> = records
        .iter()
        .filter(|r| r.status == HealthStatus::Invalid)
        .collect();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].quality_score(), 0.0);
    assert_eq!(invalid[0].protocol, "unknown");
    assert_eq!(invalid[0].validation_error.as_deref(), Some("Unknown protocol"));

    let healthy: Vec<_> = records.iter().filter(|r| r.is_healthy()).collect();
    assert_eq!(healthy.len(), 2);
    assert!(healthy.iter().all(|r| r.quality_score() == 100.0));
    assert!(healthy.iter().all(|r| r.latency_ms == Some(50.0)));
    assert_eq!(prober.calls(), 2);
}

#[tokio::test]
async fn test_run_drops_invalid_and_ranks_healthy_first() {
    let prober = Arc::new(MockProber::new(50.0));
    let servers = vec![
        vmess_config("a", 1),
        "not_a_config".to_string(),
        "vless://u@b:2".to_string(),
    ];

    let outcome = pipeline(PipelineConfig::default(), prober)
        .run(servers, &CancellationToken::new())
        .await;

    assert_eq!(outcome.records.len(), 2);
    assert!(outcome.records.iter().all(|r| r.is_healthy()));
    let mut hosts: Vec<_> = outcome
        .records
        .iter()
        .filter_map(|r| r.host.clone())
        .collect();
    hosts.sort();
    assert_eq!(hosts, vec!["a", "b"]);
    assert_eq!(outcome.summary.invalid, 1);
    assert!(!outcome.stopped_early());
}

#[tokio::test]
async fn test_cancel_during_second_batch_keeps_first_batch() {
    let token = CancellationToken::new();
    let prober = Arc::new(
        MockProber::new(20.0)
            .with_delay(Duration::from_millis(20))
            .cancelling_on_call(4, token.clone()),
    );
    let servers: Vec<String> = (1..=6).map(|i| format!("vless://u@h{}:443", i)).collect();

    let outcome = pipeline(PipelineConfig::new().with_batch_size(3), prober)
        .run(servers, &token)
        .await;

    assert_eq!(outcome.records.len(), 3);
    let mut hosts: Vec<_> = outcome
        .records
        .iter()
        .filter_map(|r| r.host.clone())
        .collect();
    hosts.sort();
    assert_eq!(hosts, vec!["h1", "h2", "h3"]);

    assert!(token.is_requested());
    assert!(outcome.stopped_early());
    assert_eq!(outcome.summary.batches_run, 1);
    assert_eq!(outcome.summary.batches_total, 2);
}

#[tokio::test]
async fn test_token_stays_set_until_reset() {
    let token = CancellationToken::new();
    let prober = Arc::new(MockProber::new(20.0).cancelling_on_call(1, token.clone()));
    let servers = vec!["vless://u@h:1".to_string()];

    let outcome = pipeline(PipelineConfig::default(), prober.clone())
        .run(servers.clone(), &token)
        .await;
    assert!(outcome.records.is_empty());
    assert!(token.is_requested());

    // a second run without reset does nothing
    let outcome = pipeline(PipelineConfig::default(), prober.clone())
        .run(servers.clone(), &token)
        .await;
    assert!(outcome.records.is_empty());
    assert_eq!(prober.calls(), 1);

    token.reset();
    let outcome = pipeline(PipelineConfig::default(), prober.clone())
        .run(servers, &token)
        .await;
    assert_eq!(outcome.records.len(), 1);
    assert!(!outcome.stopped_early());
}

#[tokio::test]
async fn test_concurrency_limit_bounds_wall_clock() {
    let per_probe = Duration::from_millis(200);
    let prober = Arc::new(MockProber::new(10.0).with_delay(per_probe));
    let checker = HealthChecker::with_prober(CheckerConfig::new().with_concurrency(2), prober);
    let entries: Vec<ServerEntry> = (1..=5)
        .map(|i| ServerEntry::from_config(format!("vless://u@h{}:443", i)))
        .collect();

    let start = Instant::now();
    let records = checker.check_servers(entries).await;
    let elapsed = start.elapsed();

    assert_eq!(records.len(), 5);
    assert!(elapsed >= per_probe * 2, "too fast: {elapsed:?}");
    assert!(elapsed < per_probe * 5, "fully serial: {elapsed:?}");
}

#[tokio::test]
async fn test_min_quality_score_filter() {
    // latencies giving scores 30, 60 and 90
    let servers = [(1000.0, "slow"), (300.0 - 1e-9, "mid"), (150.0, "fast")];
    let mut records = Vec::new();
    for (latency, host) in servers {
        let prober = Arc::new(MockProber::new(latency));
        let checker = HealthChecker::with_prober(CheckerConfig::default(), prober);
        let config = format!("vless://u@{}:443", host);
        records.push(checker.check_server(ServerEntry::from_config(config)).await);
    }

    let kept = v2ray_health::sort_by_quality(
        v2ray_health::filter_healthy_servers(records, 50.0, false),
        true,
    );
    let hosts: Vec<_> = kept.iter().filter_map(|r| r.host.as_deref()).collect();
    assert_eq!(hosts, vec!["fast", "mid"]);
    assert!((kept[0].quality_score() - 90.0).abs() < 1e-6);
    assert!((kept[1].quality_score() - 60.0).abs() < 1e-6);
}
