// src/notify/discord.rs
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{NotificationEvent, Notifier};
use crate::model::{truncate_with_marker, SourceKind};

const PREVIEW_FIELD_MAX: usize = 500;

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    async fn post_with_retry(&self, payload: &DiscordWebhookPayload) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("Discord webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("Discord webhook request failed: {e}"),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

pub(crate) fn platform_color(kind: SourceKind) -> u32 {
    match kind {
        SourceKind::LinkedIn => 0x0077B5,
        SourceKind::TikTok => 0xFF0050,
        SourceKind::Facebook => 0x1877F2,
        SourceKind::X => 0x1DA1F2,
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, ev: &NotificationEvent) -> Result<()> {
        let payload = DiscordWebhookPayload::for_event(ev);
        self.post_with_retry(&payload).await
    }
}

#[derive(Serialize)]
struct DiscordField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Serialize)]
struct DiscordFooter {
    text: String,
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    color: u32,
    timestamp: String,
    fields: Vec<DiscordField>,
    footer: DiscordFooter,
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn for_event(ev: &NotificationEvent) -> Self {
        let mut fields = vec![
            DiscordField {
                name: "Content Preview".to_string(),
                value: truncate_with_marker(&ev.snapshot.content_preview, PREVIEW_FIELD_MAX),
                inline: false,
            },
            DiscordField {
                name: "Link".to_string(),
                value: ev.snapshot.source_url.clone(),
                inline: false,
            },
        ];
        if ev.snapshot.degraded {
            fields.push(DiscordField {
                name: "Note".to_string(),
                value: "Access to this source is limited; this change may be a false positive."
                    .to_string(),
                inline: false,
            });
        }

        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title: format!("New {} Post Detected!", ev.source),
                color: platform_color(ev.source),
                timestamp: ev.detected_at.to_rfc3339(),
                fields,
                footer: DiscordFooter {
                    text: "Social Media Monitor".to_string(),
                },
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Snapshot;
    use chrono::Utc;

    #[test]
    fn embed_carries_title_color_and_link() {
        let ev = NotificationEvent {
            source: SourceKind::LinkedIn,
            snapshot: Snapshot::new("f1".into(), "We are hiring", "https://l.test/acme"),
            detected_at: Utc::now(),
        };
        let v = serde_json::to_value(DiscordWebhookPayload::for_event(&ev)).unwrap();
        let embed = &v["embeds"][0];
        assert_eq!(embed["title"], "New LinkedIn Post Detected!");
        assert_eq!(embed["color"], 0x0077B5);
        assert_eq!(embed["fields"][1]["value"], "https://l.test/acme");
        assert_eq!(embed["fields"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn degraded_snapshot_adds_a_note() {
        let ev = NotificationEvent {
            source: SourceKind::LinkedIn,
            snapshot: Snapshot::new("f1".into(), "limited", "https://l.test/acme").degraded(),
            detected_at: Utc::now(),
        };
        let v = serde_json::to_value(DiscordWebhookPayload::for_event(&ev)).unwrap();
        assert_eq!(v["embeds"][0]["fields"][2]["name"], "Note");
    }
}
