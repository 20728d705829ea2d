// src/notify/slack.rs
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::{NotificationEvent, Notifier};

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

impl SlackNotifier {
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

pub(crate) fn slack_text(ev: &NotificationEvent) -> String {
    let mut text = format!(
        "*New {} post:* {}\n<{}>\n@ {}",
        ev.source,
        ev.snapshot.content_preview,
        ev.snapshot.source_url,
        ev.detected_at.to_rfc3339()
    );
    if ev.snapshot.degraded {
        text.push_str("\n_(access limited, may be a false positive)_");
    }
    text
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, ev: &NotificationEvent) -> Result<()> {
        let body = serde_json::json!({ "text": slack_text(ev) });

        self.client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }
}
