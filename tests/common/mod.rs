// tests/common/mod.rs
//
// Test doubles shared by the integration tests: a scripted extractor and a
// recording notifier. No network, no renderer.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use social_monitor::error::ExtractionFailure;
use social_monitor::{
    Extractor, MonitorConfig, MonitoringStore, NotificationEvent, Notifier, Snapshot,
    SourceConfig, SourceKind,
};

pub fn snap(fp: &str, content: &str, url: &str) -> Snapshot {
    Snapshot::new(fp.to_string(), content, url)
}

/// Replays queued results per source kind; an exhausted queue is a failure.
#[derive(Default)]
pub struct ScriptedExtractor {
    script: Mutex<HashMap<SourceKind, VecDeque<Result<Snapshot, ExtractionFailure>>>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each extraction sleeps this long before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn push(&self, kind: SourceKind, result: Result<Snapshot, ExtractionFailure>) {
        self.script
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, source: &SourceConfig) -> Result<Snapshot, ExtractionFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self
            .script
            .lock()
            .unwrap()
            .get_mut(&source.kind)
            .and_then(VecDeque::pop_front);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        next.unwrap_or_else(|| Err(ExtractionFailure::Unreachable("script exhausted".into())))
    }
}

/// Keeps every event it is handed; optionally fails every send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<NotificationEvent>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn sources(&self) -> Vec<SourceKind> {
        self.events.lock().unwrap().iter().map(|e| e.source).collect()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, ev: &NotificationEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(ev.clone());
        if self.fail {
            anyhow::bail!("channel down");
        }
        Ok(())
    }
}

/// Config for tests: no pause between sources.
pub fn test_config(sources: Vec<SourceConfig>) -> MonitorConfig {
    let mut cfg = MonitorConfig::with_sources(sources);
    cfg.source_pause_ms = 0;
    cfg
}

pub fn memory_store() -> Arc<MonitoringStore> {
    Arc::new(MonitoringStore::open_in_memory().expect("in-memory store"))
}
