// src/status.rs
//! Read-only projection of the store for the dashboard and `/api/status`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{truncate_with_marker, MonitoringStatus, SourceConfig};

const STATUS_PREVIEW_CHARS: usize = 100;
const STATUS_ERROR_CHARS: usize = 100;
const NOT_CHECKED: &str = "Not checked yet";
const NO_POSTS: &str = "No posts found";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub source_id: String,
    pub url: String,
    pub last_post: String,
    pub last_fingerprint: Option<String>,
    pub last_source_url: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub has_new_content: bool,
    pub last_error: Option<String>,
    pub check_count: u64,
    pub success_count: u64,
    /// Percentage, one decimal.
    pub success_rate: f64,
}

impl StatusReport {
    fn unchecked(source: &SourceConfig) -> Self {
        Self {
            source_id: source.id().to_string(),
            url: source.url.clone(),
            last_post: NOT_CHECKED.to_string(),
            last_fingerprint: None,
            last_source_url: None,
            last_checked_at: None,
            has_new_content: false,
            last_error: None,
            check_count: 0,
            success_count: 0,
            success_rate: 0.0,
        }
    }

    fn from_row(row: MonitoringStatus) -> Self {
        let success_rate = (row.success_ratio() * 1000.0).round() / 10.0;
        let last_post = match row.last_content_preview.as_deref() {
            Some(p) if !p.is_empty() => truncate_with_marker(p, STATUS_PREVIEW_CHARS),
            _ => NO_POSTS.to_string(),
        };
        Self {
            source_id: row.source_id,
            url: row.url,
            last_post,
            last_fingerprint: row.last_fingerprint,
            last_source_url: row.last_source_url,
            last_checked_at: row.last_checked_at,
            has_new_content: row.has_new_content,
            last_error: row
                .last_error
                .map(|e| truncate_with_marker(&e, STATUS_ERROR_CHARS)),
            check_count: row.check_count,
            success_count: row.success_count,
            success_rate,
        }
    }
}

/// One entry per configured source in configured order, then any stored rows
/// for sources no longer configured.
pub fn build_report(configured: &[SourceConfig], rows: Vec<MonitoringStatus>) -> Vec<StatusReport> {
    let mut rows: Vec<Option<MonitoringStatus>> = rows.into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(configured.len().max(rows.len()));

    for source in configured {
        let stored = rows
            .iter_mut()
            .find(|r| r.as_ref().is_some_and(|r| r.source_id == source.id()))
            .and_then(Option::take);
        out.push(match stored {
            Some(row) => StatusReport::from_row(row),
            None => StatusReport::unchecked(source),
        });
    }

    out.extend(rows.into_iter().flatten().map(StatusReport::from_row));
    out
}
