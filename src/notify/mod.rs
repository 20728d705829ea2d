// src/notify/mod.rs
//! Outbound "new content" notifications.
//!
//! The engine only ever sees the `Notifier` trait; Discord and Slack webhooks
//! are thin adapters behind it. A failed send is logged and never retried by
//! the engine: the change is already durable in the store.

pub mod discord;
pub mod slack;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Snapshot, SourceKind};

pub use discord::DiscordNotifier;
pub use slack::SlackNotifier;

#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub source: SourceKind,
    pub snapshot: Snapshot,
    pub detected_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, ev: &NotificationEvent) -> Result<()>;
}

/// Fans one event out to every configured channel.
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Channels enabled by `DISCORD_WEBHOOK_URL` / `SLACK_WEBHOOK_URL`.
    pub fn from_env() -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(url) = env_non_empty("DISCORD_WEBHOOK_URL") {
            channels.push(Box::new(DiscordNotifier::new(url)));
        }
        if let Some(url) = env_non_empty("SLACK_WEBHOOK_URL") {
            channels.push(Box::new(SlackNotifier::new(url)));
        }
        Self { channels }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

#[async_trait::async_trait]
impl Notifier for NotifierMux {
    fn name(&self) -> &'static str {
        "mux"
    }

    /// Errors only when every channel failed.
    async fn send(&self, ev: &NotificationEvent) -> Result<()> {
        let mut delivered = 0usize;
        for ch in &self.channels {
            match ch.send(ev).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(
                    target: "notify",
                    channel = ch.name(),
                    source = %ev.source,
                    error = ?e,
                    "notification failed"
                ),
            }
        }
        if delivered == 0 && !self.channels.is_empty() {
            anyhow::bail!("all {} notification channels failed", self.channels.len());
        }
        Ok(())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
