use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> anyhow::Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new().install_recorder()?;
        describe_metrics();
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

/// Register HELP text and units with the installed recorder. Descriptions sent
/// before a recorder exists are lost, so this runs right after installation.
fn describe_metrics() {
    describe_counter!("monitor_checks_total", "Source checks started");
    describe_counter!("monitor_check_failures_total", "Source checks that failed");
    describe_counter!("monitor_changes_total", "New content detections");
    describe_counter!(
        "monitor_notifications_dropped_total",
        "Change events that reached no notification channel"
    );
    describe_histogram!("monitor_check_ms", Unit::Milliseconds, "Duration of one source check");
    describe_gauge!("monitor_last_cycle_ts", Unit::Seconds, "Unix time of the last finished cycle");
}
