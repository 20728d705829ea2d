// src/scheduler.rs
//! Drives check cycles over every configured source.
//!
//! `Idle -> Running(cycle) -> Idle`. A cycle is started by the interval timer or
//! by a manual trigger; both go through the same cycle lock, so cycles never
//! overlap and a manual trigger waits for a running cycle to finish first.
//! Sources are checked sequentially, in configured order, with a short pause in
//! between.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::change_detector::{self, CheckOutcome};
use crate::config::MonitorConfig;
use crate::error::StorageFailure;
use crate::extract::Extractor;
use crate::model::{ChangeRecord, SourceConfig};
use crate::notify::{NotificationEvent, Notifier};
use crate::status::{build_report, StatusReport};
use crate::store::MonitoringStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Summary of one finished cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub checked: usize,
    pub changed: usize,
    pub failed: usize,
    pub notified: usize,
    pub dropped: usize,
}

/// Holds the `Running` state; lowered on drop, including when a cycle future
/// is cancelled mid-run.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Monitor {
    sources: Vec<SourceConfig>,
    store: Arc<MonitoringStore>,
    extractor: Arc<dyn Extractor>,
    notifier: RwLock<Option<Arc<dyn Notifier>>>,
    interval: Duration,
    source_pause: Duration,
    notify_on_degraded: bool,
    cycle_lock: Mutex<()>,
    running: AtomicBool,
    cycles: AtomicU64,
}

impl Monitor {
    pub fn new(
        cfg: &MonitorConfig,
        store: Arc<MonitoringStore>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            sources: cfg.sources.clone(),
            store,
            extractor,
            notifier: RwLock::new(None),
            interval: cfg.check_interval(),
            source_pause: cfg.source_pause(),
            notify_on_degraded: cfg.notify_on_degraded,
            cycle_lock: Mutex::new(()),
            running: AtomicBool::new(false),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn with_notifier(self, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier: RwLock::new(Some(notifier)),
            ..self
        }
    }

    /// Attach or detach the live notification channel.
    pub async fn set_notifier(&self, notifier: Option<Arc<dyn Notifier>>) {
        *self.notifier.write().await = notifier;
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    pub fn store(&self) -> &MonitoringStore {
        &self.store
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Run one cycle now. Waits for an in-progress cycle to finish first.
    pub async fn trigger_manual_check(&self) -> CycleReport {
        info!(target: "monitor", "manual check requested");
        self.run_cycle().await
    }

    /// Status of every configured source, checked or not.
    pub fn status_snapshot(&self) -> Result<Vec<StatusReport>, StorageFailure> {
        let rows = self.store.list_all()?;
        Ok(build_report(&self.sources, rows))
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let _guard = self.cycle_lock.lock().await;
        let _running = RunningFlag::raise(&self.running);

        let started_at = Utc::now();
        info!(target: "monitor", sources = self.sources.len(), "starting check cycle");

        let mut report = CycleReport {
            started_at,
            finished_at: started_at,
            checked: 0,
            changed: 0,
            failed: 0,
            notified: 0,
            dropped: 0,
        };

        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 && !self.source_pause.is_zero() {
                tokio::time::sleep(self.source_pause).await;
            }

            let outcome = self.check_isolated(source).await;
            report.checked += 1;
            match outcome {
                CheckOutcome::Changed(record) => {
                    report.changed += 1;
                    if self.emit(source, record).await {
                        report.notified += 1;
                    } else {
                        report.dropped += 1;
                    }
                }
                CheckOutcome::Unchanged(_) => {}
                CheckOutcome::Failed(_) => report.failed += 1,
            }
        }

        report.finished_at = Utc::now();
        self.cycles.fetch_add(1, Ordering::SeqCst);
        gauge!("monitor_last_cycle_ts").set(report.finished_at.timestamp() as f64);

        info!(
            target: "monitor",
            checked = report.checked,
            changed = report.changed,
            failed = report.failed,
            notified = report.notified,
            "check cycle completed"
        );
        report
    }

    /// Runs one detection on its own task so a panic stays local to the source.
    async fn check_isolated(&self, source: &SourceConfig) -> CheckOutcome {
        let checks_before = match self.store.get(source.id()) {
            Ok(row) => row.map_or(0, |r| r.check_count),
            Err(_) => 0,
        };
        let task = {
            let extractor = self.extractor.clone();
            let store = self.store.clone();
            let source = source.clone();
            tokio::spawn(async move {
                change_detector::detect(&source, extractor.as_ref(), &store).await
            })
        };

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(target: "monitor", source = source.id(), error = %e, "check task aborted");
                change_detector::record_aborted(
                    source,
                    &self.store,
                    checks_before,
                    format!("check aborted: {e}"),
                )
            }
        }
    }

    /// Returns whether the event reached a notification channel.
    async fn emit(&self, source: &SourceConfig, record: ChangeRecord) -> bool {
        if record.snapshot.degraded && !self.notify_on_degraded {
            debug!(target: "notify", source = source.id(), "degraded change; notification suppressed");
            return false;
        }

        let Some(notifier) = self.notifier.read().await.clone() else {
            counter!("monitor_notifications_dropped_total").increment(1);
            info!(target: "notify", source = source.id(), "no notification channel; event dropped");
            return false;
        };

        let ev = NotificationEvent {
            source: source.kind,
            snapshot: record.snapshot,
            detected_at: record.detected_at,
        };
        match notifier.send(&ev).await {
            Ok(()) => {
                info!(target: "notify", source = source.id(), channel = notifier.name(), "notification sent");
                true
            }
            Err(e) => {
                counter!("monitor_notifications_dropped_total").increment(1);
                warn!(target: "notify", source = source.id(), error = ?e, "notification failed");
                false
            }
        }
    }

    /// Immediate first cycle, then one per interval until the task is aborted.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                target: "monitor",
                interval_secs = self.interval.as_secs(),
                "scheduler started"
            );
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.run_cycle().await;
            }
        })
    }
}
