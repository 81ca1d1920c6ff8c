// src/metrics.rs
use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the static cache TTL gauge.
    /// Fails if another recorder is already installed in this process.
    pub fn init(cache_ttl_secs: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_all();
        // Absolute TTL, no sliding refresh
        gauge!("trending_cache_ttl_secs").set(cache_ttl_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metric descriptions (so series show up on /metrics with help text).
pub fn describe_all() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("trending_cache_hits_total", "Trending lookups served from the grid cache.");
        describe_counter!("trending_cache_misses_total", "Trending lookups that recomputed.");
        describe_counter!(
            "trending_fallback_total",
            "Trending computations that used the relevance fallback."
        );
        describe_histogram!("trending_compute_ms", "Trending recomputation time in milliseconds.");
        describe_counter!("events_recorded_total", "Interaction events accepted.");
        describe_counter!("events_rejected_total", "Interaction events rejected as invalid.");
        describe_counter!("summary_requests_total", "External summary calls started.");
        describe_counter!("summary_memo_hits_total", "Summaries served from the memo table.");
        describe_counter!(
            "summary_failures_total",
            "Summary calls that failed or timed out (sentinel substituted)."
        );
        describe_counter!(
            "intent_fallback_total",
            "Intent parses that failed or timed out (search fallback used)."
        );
        describe_gauge!("trending_cache_ttl_secs", "Configured trending cache TTL in seconds.");
    });
}
