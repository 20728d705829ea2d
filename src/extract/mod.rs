// src/extract/mod.rs
pub mod fetch;
pub mod platforms;
pub mod render;

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::error::{ConfigurationError, ExtractionFailure};
use crate::model::{Snapshot, SourceConfig};
use fetch::PlainFetcher;
use platforms::{strategy_for, SourceStrategy};
use render::{RenderRuntime, RuntimeState};

/// Turns a configured source into a `Snapshot`. Either a complete snapshot or a
/// failure, never anything in between.
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, source: &SourceConfig) -> Result<Snapshot, ExtractionFailure>;
}

/// Rendered-page extraction with plain-fetch fallback.
pub struct SourceExtractor {
    runtime: RenderRuntime,
    fetcher: PlainFetcher,
}

impl SourceExtractor {
    pub fn new(runtime: RenderRuntime, fetcher: PlainFetcher) -> Self {
        Self { runtime, fetcher }
    }

    pub fn from_config(cfg: &MonitorConfig) -> Result<Self, ConfigurationError> {
        let runtime = RenderRuntime::new(cfg.renderer.clone(), cfg.render_timeout());
        let fetcher = PlainFetcher::new(&cfg.user_agent, cfg.request_timeout())?;
        Ok(Self::new(runtime, fetcher))
    }

    pub fn runtime_state(&self) -> RuntimeState {
        self.runtime.state()
    }

    async fn extract_fallback(
        &self,
        strategy: &dyn SourceStrategy,
        source: &SourceConfig,
    ) -> Result<Snapshot, ExtractionFailure> {
        let delay = strategy.fallback_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let page = self.fetcher.get(&source.url).await?;
        debug!(target: "extract", source = %source.kind, status = page.status, "plain fetch");
        strategy.extract_fallback(&page, &source.url, Utc::now())
    }
}

#[async_trait::async_trait]
impl Extractor for SourceExtractor {
    async fn extract(&self, source: &SourceConfig) -> Result<Snapshot, ExtractionFailure> {
        let strategy = strategy_for(source.kind);

        // Init failures are logged once by the runtime itself.
        if let Ok(client) = self.runtime.client().await {
            match client.content(&source.url, strategy.render_wait()).await {
                Ok(html) => {
                    return strategy
                        .extract_primary(&html, &source.url, Utc::now())
                        .ok_or(ExtractionFailure::NoContent { kind: source.kind });
                }
                Err(e) => {
                    warn!(
                        target: "extract",
                        source = %source.kind,
                        error = %e,
                        "render failed; falling back to plain fetch"
                    );
                }
            }
        }

        self.extract_fallback(strategy, source).await
    }
}
