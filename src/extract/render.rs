// src/extract/render.rs
//! Primary extraction runtime: a remote headless browser that returns fully
//! rendered HTML through the Browserless `/content` API.
//!
//! The runtime is shared and expensive, so it is initialized lazily and at most
//! once per process. If initialization fails the failure is permanent and every
//! later extraction goes straight to the plain-fetch path.

use serde_json::json;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::RendererConfig;
use crate::error::ExtractionFailure;

/// Observable lifecycle of the render runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeState {
    Uninitialized,
    Ready,
    Failed(String),
}

pub struct RenderClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RenderClient {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("building render client: {e}"))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}{}", self.base_url, path);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Cheap reachability check run once during initialization.
    pub async fn probe(&self) -> Result<(), String> {
        let resp = self
            .client
            .get(self.endpoint("/json/version"))
            .send()
            .await
            .map_err(|e| format!("probe request failed: {e}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("probe returned status {}", status.as_u16()));
        }
        Ok(())
    }

    /// Fetch fully-rendered HTML for `url`, letting client-side scripts run for `wait`.
    pub async fn content(&self, url: &str, wait: Duration) -> Result<String, ExtractionFailure> {
        let body = json!({
            "url": url,
            "waitForTimeout": wait.as_millis() as u64,
        });

        let resp = self
            .client
            .post(self.endpoint("/content"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExtractionFailure::HttpStatus {
                status: status.as_u16(),
            });
        }

        Ok(resp.text().await?)
    }
}

pub struct RenderRuntime {
    settings: Option<RendererConfig>,
    timeout: Duration,
    slot: OnceCell<Result<RenderClient, String>>,
}

impl RenderRuntime {
    pub fn new(settings: Option<RendererConfig>, timeout: Duration) -> Self {
        Self {
            settings,
            timeout,
            slot: OnceCell::new(),
        }
    }

    /// A runtime with nothing to connect to; fails on first use.
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(1))
    }

    pub fn state(&self) -> RuntimeState {
        match self.slot.get() {
            None => RuntimeState::Uninitialized,
            Some(Ok(_)) => RuntimeState::Ready,
            Some(Err(reason)) => RuntimeState::Failed(reason.clone()),
        }
    }

    /// The ready client, initializing on first call. Never retries a failed init.
    pub async fn client(&self) -> Result<&RenderClient, ExtractionFailure> {
        self.slot
            .get_or_init(|| self.initialize())
            .await
            .as_ref()
            .map_err(|reason| ExtractionFailure::RuntimeUnavailable(reason.clone()))
    }

    async fn initialize(&self) -> Result<RenderClient, String> {
        let Some(settings) = &self.settings else {
            info!(target: "extract", "no renderer configured; using plain fetch for all sources");
            return Err("no renderer configured".to_string());
        };

        let result = match RenderClient::new(&settings.url, settings.token.as_deref(), self.timeout) {
            Ok(client) => client.probe().await.map(|_| client),
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => info!(target: "extract", url = %settings.url, "render runtime ready"),
            Err(reason) => warn!(
                target: "extract",
                url = %settings.url,
                error = %reason,
                "render runtime failed to initialize; using plain fetch for the rest of this run"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_runtime_fails_once_and_stays_failed() {
        let rt = RenderRuntime::disabled();
        assert_eq!(rt.state(), RuntimeState::Uninitialized);

        let first = rt.client().await;
        assert!(matches!(first, Err(ExtractionFailure::RuntimeUnavailable(_))));
        assert_eq!(
            rt.state(),
            RuntimeState::Failed("no renderer configured".to_string())
        );

        // Second call reuses the recorded failure.
        assert!(rt.client().await.is_err());
        assert!(matches!(rt.state(), RuntimeState::Failed(_)));
    }

    #[tokio::test]
    async fn unreachable_renderer_is_a_permanent_failure() {
        let rt = RenderRuntime::new(
            Some(RendererConfig {
                url: "http://127.0.0.1:9".to_string(),
                token: None,
            }),
            Duration::from_millis(500),
        );
        assert!(rt.client().await.is_err());
        match rt.state() {
            RuntimeState::Failed(reason) => assert!(reason.contains("probe")),
            other => panic!("expected failed runtime, got {other:?}"),
        }
    }

    #[test]
    fn token_is_appended_to_endpoints() {
        let c = RenderClient::new("http://render.local/", Some("abc"), Duration::from_secs(1))
            .unwrap();
        assert_eq!(c.endpoint("/content"), "http://render.local/content?token=abc");
    }
}
