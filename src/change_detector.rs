// src/change_detector.rs
//! One check of one source: extract, compare against the stored fingerprint,
//! persist the outcome.
//!
//! Failures never escape `detect`: an extraction or storage error is recorded
//! into the source's `last_error` (best effort) and reported as `Failed`.

use chrono::Utc;
use metrics::{counter, histogram};
use tracing::{info, warn};

use crate::extract::Extractor;
use crate::model::{ChangeRecord, Snapshot, SourceConfig};
use crate::store::{MonitoringStore, StatusUpdate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// New content (or first observation); the record is already in `change_log`.
    Changed(ChangeRecord),
    Unchanged(Snapshot),
    Failed(String),
}

impl CheckOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, CheckOutcome::Changed(_))
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            CheckOutcome::Changed(rec) => Some(&rec.snapshot),
            CheckOutcome::Unchanged(snap) => Some(snap),
            CheckOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CheckOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

pub async fn detect(
    source: &SourceConfig,
    extractor: &dyn Extractor,
    store: &MonitoringStore,
) -> CheckOutcome {
    let t0 = std::time::Instant::now();
    let id = source.id();
    counter!("monitor_checks_total", "source" => id).increment(1);

    let outcome = run_check(source, extractor, store).await;

    histogram!("monitor_check_ms", "source" => id).record(t0.elapsed().as_secs_f64() * 1_000.0);
    match &outcome {
        CheckOutcome::Changed(rec) => {
            counter!("monitor_changes_total", "source" => id).increment(1);
            info!(
                target: "monitor",
                source = id,
                fingerprint = %rec.snapshot.fingerprint,
                degraded = rec.snapshot.degraded,
                "new content detected"
            );
        }
        CheckOutcome::Unchanged(_) => {
            tracing::debug!(target: "monitor", source = id, "no change");
        }
        CheckOutcome::Failed(e) => {
            counter!("monitor_check_failures_total", "source" => id).increment(1);
            warn!(target: "monitor", source = id, error = %e, "check failed");
        }
    }
    outcome
}

async fn run_check(
    source: &SourceConfig,
    extractor: &dyn Extractor,
    store: &MonitoringStore,
) -> CheckOutcome {
    let id = source.id();

    let previous = match store.get(id) {
        Ok(p) => p,
        Err(e) => return record_failure(source, store, e.to_string()),
    };

    let snapshot = match extractor.extract(source).await {
        Ok(s) => s,
        Err(e) => return record_failure(source, store, e.to_string()),
    };

    // No prior row, or a never-successful one, counts as a first observation.
    let changed = previous
        .as_ref()
        .and_then(|p| p.last_fingerprint.as_deref())
        .map_or(true, |last| last != snapshot.fingerprint);

    let now = Utc::now();
    let update = StatusUpdate::success(&source.url, snapshot.clone(), changed, now);
    if let Err(e) = store.upsert(id, &update) {
        return record_failure(source, store, e.to_string());
    }

    if !changed {
        return CheckOutcome::Unchanged(snapshot);
    }

    let record = ChangeRecord {
        source_id: id.to_string(),
        snapshot,
        detected_at: now,
    };
    if let Err(e) = store.append_change(&record) {
        // Status already says "new content"; the audit row is what went missing.
        warn!(target: "monitor", source = id, error = %e, "change detected but not logged");
    }
    CheckOutcome::Changed(record)
}

fn record_failure(
    source: &SourceConfig,
    store: &MonitoringStore,
    error: String,
) -> CheckOutcome {
    let update = StatusUpdate::failure(&source.url, error.clone(), Utc::now());
    if let Err(e) = store.upsert(source.id(), &update) {
        warn!(
            target: "monitor",
            source = source.id(),
            error = %e,
            "could not record failed check"
        );
    }
    CheckOutcome::Failed(error)
}

/// A check whose task died. `checks_before` is the source's `check_count` from
/// before the task started; if the task already wrote its row, only the error
/// is recorded so the attempt is not counted twice.
pub(crate) fn record_aborted(
    source: &SourceConfig,
    store: &MonitoringStore,
    checks_before: u64,
    error: String,
) -> CheckOutcome {
    let already_counted = match store.get(source.id()) {
        Ok(row) => row.map_or(0, |r| r.check_count) > checks_before,
        Err(_) => false,
    };
    if !already_counted {
        return record_failure(source, store, error);
    }

    let mut update = StatusUpdate::failure(&source.url, error.clone(), Utc::now());
    update.check_increment = 0;
    if let Err(e) = store.upsert(source.id(), &update) {
        warn!(
            target: "monitor",
            source = source.id(),
            error = %e,
            "could not record aborted check"
        );
    }
    CheckOutcome::Failed(error)
}
