use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Histogram bucket boundaries for admit-path latency (seconds). The admit
/// path is dominated by per-key lock contention, not I/O, so the buckets
/// skew low relative to a typical upstream-request histogram.
const ADMIT_LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0,
];

/// Thin handle around the global metrics recorder.
///
/// After `Metrics::install()` the `metrics` crate macros (`counter!`, `gauge!`,
/// `histogram!`) can be used anywhere in the codebase. The `PrometheusHandle`
/// is retained solely for rendering the `/metrics` endpoint (§4.4, §7b).
#[derive(Clone)]
pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and register metric descriptions.
    ///
    /// Idempotent: the underlying recorder can only be installed once per
    /// process, which multiple `ReplicaState`s in one test binary would
    /// otherwise violate. Subsequent calls reuse the first handle.
    pub fn install() -> Self {
        if let Some(handle) = RECORDER.get() {
            return Self {
                handle: handle.clone(),
            };
        }

        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Full(
                    "rate_limiter_admit_duration_seconds".to_string(),
                ),
                ADMIT_LATENCY_BUCKETS,
            )
            .expect("valid matcher")
            .install_recorder()
            .expect("failed to install metrics recorder");

        let _ = RECORDER.set(handle.clone());

        describe_counter!(
            "rate_limiter_admit_total",
            Unit::Count,
            "Total admit decisions, labeled by result (admit|deny|transient)"
        );
        describe_counter!(
            "rate_limiter_invalid_request_total",
            Unit::Count,
            "Total requests rejected before an admit decision was made"
        );
        describe_histogram!(
            "rate_limiter_admit_duration_seconds",
            Unit::Seconds,
            "Time spent inside AccessStore::admit, including lock wait"
        );
        describe_gauge!(
            "rate_limiter_clients_tracked",
            Unit::Count,
            "Number of distinct ClientIds with a live record"
        );

        describe_counter!(
            "rate_limiter_gossip_sent_total",
            Unit::Count,
            "Total peer broadcast attempts, labeled by peer and result"
        );
        describe_counter!(
            "rate_limiter_gossip_received_total",
            Unit::Count,
            "Total inbound peer digests, labeled by result (success|parse_error)"
        );
        describe_histogram!(
            "rate_limiter_gossip_broadcast_entries",
            Unit::Count,
            "Digest size (distinct ClientIds) per broadcast tick"
        );

        Self { handle }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_is_idempotent_and_renders_registered_metrics() {
        let a = Metrics::install();
        let b = Metrics::install();

        metrics::counter!("rate_limiter_admit_total", "result" => "admit").increment(1);
        let rendered_a = a.render();
        let rendered_b = b.render();
        assert!(rendered_a.contains("rate_limiter_admit_total"));
        assert_eq!(rendered_a, rendered_b);
    }
}
