// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod change_detector;
pub mod config;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod scheduler;
pub mod status;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::MonitorConfig;
pub use crate::extract::{Extractor, SourceExtractor};
pub use crate::model::{ChangeRecord, MonitoringStatus, Snapshot, SourceConfig, SourceKind};
pub use crate::notify::{NotificationEvent, Notifier, NotifierMux};
pub use crate::scheduler::{CycleReport, Monitor};
pub use crate::store::MonitoringStore;

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines.
/// A no-op when the host (e.g. Shuttle) already installed one.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("monitor=info,extract=info,store=info,notify=info,api=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Wire store, extractor and notification channels for `cfg`.
pub async fn build_monitor(cfg: &MonitorConfig) -> anyhow::Result<Arc<Monitor>> {
    let store = Arc::new(MonitoringStore::open(&cfg.database_path)?);
    let extractor: Arc<dyn Extractor> = Arc::new(SourceExtractor::from_config(cfg)?);
    let monitor = Monitor::new(cfg, store, extractor);

    let mux = NotifierMux::from_env();
    if mux.is_empty() {
        info!(target: "notify", "no notification channel configured; changes are only stored");
    } else {
        info!(target: "notify", channels = mux.len(), "notification channels ready");
        monitor.set_notifier(Some(Arc::new(mux))).await;
    }

    info!(
        target: "monitor",
        sources = cfg.sources.len(),
        database = %cfg.database_path,
        renderer = cfg.renderer.is_some(),
        "monitor ready"
    );
    Ok(Arc::new(monitor))
}
