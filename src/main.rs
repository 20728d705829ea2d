//! Social Monitor: binary entrypoint.
//! Loads config, starts the check scheduler and serves the status API.

use shuttle_axum::ShuttleAxum;
use tracing::info;

use social_monitor::metrics::Metrics;
use social_monitor::{api, build_monitor, init_tracing, MonitorConfig};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = MonitorConfig::load_default().map_err(anyhow::Error::from)?;

    // Recorder first: series and descriptions emitted before it are lost.
    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = ?e, "prometheus recorder not installed; /metrics disabled");
            None
        }
    };

    let monitor = build_monitor(&cfg).await?;

    // The scheduler task lives as long as the runtime.
    let _scheduler = monitor.clone().spawn();

    let mut router = api::router(monitor);
    if let Some(m) = &metrics {
        router = router.merge(m.router());
    }

    info!(interval_secs = cfg.check_interval_secs, "social monitor started");
    Ok(router.into())
}
