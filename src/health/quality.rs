//! Quality scoring, filtering and ranking of health records

use crate::health::models::{HealthStatus, ServerHealth};

/// Connects at or above this latency are classified as degraded
pub const DEGRADED_LATENCY_MS: f64 = 500.0;

/// Lowest score a reachable server can get
const SCORE_FLOOR: f64 = 30.0;

/// Score a health observation on a 0-100 scale
///
/// - invalid: 0
/// - unreachable: 10
/// - valid but never probed: 50
/// - under 100 ms: 100
/// - 100 to 300 ms: linear decay from 100 to 60
/// - 300 ms and above: `100 - 0.15 * latency`, floored at 30
pub fn score(status: HealthStatus, latency_ms: Option<f64>) -> f64 {
    match status {
        HealthStatus::Invalid => return 0.0,
        HealthStatus::Unreachable => return 10.0,
        HealthStatus::Healthy | HealthStatus::Degraded => {}
    }

    let Some(latency) = latency_ms else {
        return 50.0;
    };

    if latency < 100.0 {
        100.0
    } else if latency < 300.0 {
        100.0 - (latency - 100.0) * 0.2
    } else {
        (100.0 - latency * 0.15).max(SCORE_FLOOR)
    }
}

/// Status of a server whose connect completed in `latency_ms`
pub fn classify_latency(latency_ms: f64) -> HealthStatus {
    if latency_ms < DEGRADED_LATENCY_MS {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    }
}

/// Keep records worth using
///
/// Invalid records are always dropped, unreachable ones only when
/// `exclude_unreachable` is set. Whatever remains must score at least
/// `min_quality_score`.
pub fn filter_healthy_servers(
    records: Vec<ServerHealth>,
    min_quality_score: f64,
    exclude_unreachable: bool,
) -> Vec<ServerHealth> {
    records
        .into_iter()
        .filter(|r| r.status != HealthStatus::Invalid)
        .filter(|r| !(exclude_unreachable && r.status == HealthStatus::Unreachable))
        .filter(|r| r.quality_score() >= min_quality_score)
        .collect()
}

/// Stable sort by quality score
pub fn sort_by_quality(mut records: Vec<ServerHealth>, descending: bool) -> Vec<ServerHealth> {
    records.sort_by(|a, b| {
        let ord = a.quality_score().total_cmp(&b.quality_score());
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::models::{ParsedTarget, ServerEntry};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn reachable(name: &str, latency: f64) -> ServerHealth {
        ServerHealth::reachable(
            ServerEntry::new(name, "vless"),
            ParsedTarget::new("h", 1).unwrap(),
            latency,
        )
    }

    #[test]
    fn test_score_fixed_values() {
        assert_eq!(score(HealthStatus::Invalid, Some(10.0)), 0.0);
        assert_eq!(score(HealthStatus::Invalid, None), 0.0);
        assert_eq!(score(HealthStatus::Unreachable, None), 10.0);
        assert_eq!(score(HealthStatus::Unreachable, Some(10.0)), 10.0);
        assert_eq!(score(HealthStatus::Healthy, None), 50.0);
    }

    #[test]
    fn test_score_latency_bands() {
        assert_eq!(score(HealthStatus::Healthy, Some(50.0)), 100.0);
        assert_eq!(score(HealthStatus::Healthy, Some(99.9)), 100.0);
        assert!(approx(score(HealthStatus::Healthy, Some(100.0)), 100.0));
        assert!(approx(score(HealthStatus::Healthy, Some(200.0)), 80.0));
        assert!(approx(score(HealthStatus::Healthy, Some(299.0)), 60.2));
        assert!(approx(score(HealthStatus::Healthy, Some(300.0)), 55.0));
        assert!(approx(score(HealthStatus::Healthy, Some(400.0)), 40.0));
        assert_eq!(score(HealthStatus::Degraded, Some(1000.0)), 30.0);
        assert_eq!(score(HealthStatus::Degraded, Some(60_000.0)), 30.0);
    }

    #[test]
    fn test_classify_latency() {
        assert_eq!(classify_latency(0.0), HealthStatus::Healthy);
        assert_eq!(classify_latency(499.9), HealthStatus::Healthy);
        assert_eq!(classify_latency(500.0), HealthStatus::Degraded);
    }

    #[test]
    fn test_filter_by_min_score() {
        let records = vec![
            reachable("a", 1000.0),
            reachable("b", 250.0),
            reachable("c", 150.0),
        ];
        let scores: Vec<f64> = records.iter().map(|r| r.quality_score()).collect();
        assert!(approx(scores[0], 30.0));
        assert!(approx(scores[1], 70.0));
        assert!(approx(scores[2], 90.0));

        let kept = filter_healthy_servers(records, 50.0, false);
        let names: Vec<&str> = kept.iter().map(|r| r.config.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_filter_drops_invalid_and_optionally_unreachable() {
        let entry = |n: &str| ServerEntry::new(n, "vless");
        let target = ParsedTarget::new("h", 1).unwrap();
        let records = vec![
            ServerHealth::invalid(entry("bad"), "Unknown protocol".into()),
            ServerHealth::unreachable(entry("down"), target, "Connection timeout".into()),
            reachable("up", 10.0),
        ];

        let kept = filter_healthy_servers(records.clone(), 0.0, false);
        assert_eq!(kept.len(), 2);

        let kept = filter_healthy_servers(records, 0.0, true);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].config, "up");
    }

    #[test]
    fn test_sort_by_quality() {
        let records = vec![
            reachable("mid", 200.0),
            reachable("low", 1000.0),
            reachable("top", 20.0),
        ];

        let desc = sort_by_quality(records.clone(), true);
        let names: Vec<&str> = desc.iter().map(|r| r.config.as_str()).collect();
        assert_eq!(names, vec!["top", "mid", "low"]);

        let asc = sort_by_quality(records, false);
        let names: Vec<&str> = asc.iter().map(|r| r.config.as_str()).collect();
        assert_eq!(names, vec!["low", "mid", "top"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_scores() {
        let records = vec![reachable("first", 10.0), reachable("second", 20.0)];
        let sorted = sort_by_quality(records, true);
        assert_eq!(sorted[0].config, "first");
        assert_eq!(sorted[1].config, "second");
    }
}
