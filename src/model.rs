// src/model.rs
//! Core records shared by the extractor, the change detector and the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum preview length, continuation marker included.
pub const PREVIEW_MAX_CHARS: usize = 200;
const CONTINUATION: &str = "...";

/// The platforms the monitor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    LinkedIn,
    TikTok,
    Facebook,
    X,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::LinkedIn,
        SourceKind::TikTok,
        SourceKind::Facebook,
        SourceKind::X,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::LinkedIn => "LinkedIn",
            SourceKind::TikTok => "TikTok",
            SourceKind::Facebook => "Facebook",
            SourceKind::X => "X",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    /// Case-insensitive; accepts "twitter" as an alias for X.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linkedin" => Ok(SourceKind::LinkedIn),
            "tiktok" => Ok(SourceKind::TikTok),
            "facebook" => Ok(SourceKind::Facebook),
            "x" | "twitter" => Ok(SourceKind::X),
            other => Err(format!("unknown source kind: {other}")),
        }
    }
}

/// One configured source. Immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub url: String,
}

impl SourceConfig {
    pub fn new(kind: SourceKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }

    /// Key of this source's row in the store.
    pub fn id(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// Result of one successful extraction. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub fingerprint: String,
    pub content_preview: String,
    pub source_url: String,
    /// Synthesized because the source blocked plain access.
    #[serde(default)]
    pub degraded: bool,
}

impl Snapshot {
    pub fn new(fingerprint: String, content: &str, source_url: impl Into<String>) -> Self {
        Self {
            fingerprint,
            content_preview: truncate_preview(content),
            source_url: source_url.into(),
            degraded: false,
        }
    }

    pub fn degraded(mut self) -> Self {
        self.degraded = true;
        self
    }
}

/// Per-source row in `monitoring_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringStatus {
    pub source_id: String,
    pub url: String,
    pub last_fingerprint: Option<String>,
    pub last_content_preview: Option<String>,
    pub last_source_url: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub has_new_content: bool,
    pub last_error: Option<String>,
    pub check_count: u64,
    pub success_count: u64,
}

impl MonitoringStatus {
    /// `success_count / max(check_count, 1)`
    pub fn success_ratio(&self) -> f64 {
        self.success_count as f64 / self.check_count.max(1) as f64
    }
}

/// Append-only audit entry written when a change is detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub source_id: String,
    pub snapshot: Snapshot,
    pub detected_at: DateTime<Utc>,
}

/// Trim, then cap at `PREVIEW_MAX_CHARS` with a `...` marker when cut.
pub fn truncate_preview(text: &str) -> String {
    truncate_with_marker(text.trim(), PREVIEW_MAX_CHARS)
}

/// Cap `text` at `max` chars total; the marker counts towards the cap.
pub fn truncate_with_marker(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(CONTINUATION.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(CONTINUATION);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_preview_is_untouched() {
        assert_eq!(truncate_preview("  Hello  "), "Hello");
    }

    #[test]
    fn long_preview_is_capped_with_marker() {
        let long = "a".repeat(500);
        let out = truncate_preview(&long);
        assert_eq!(out.chars().count(), PREVIEW_MAX_CHARS);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let long = "ž".repeat(300);
        let out = truncate_with_marker(&long, 10);
        assert_eq!(out, format!("{}...", "ž".repeat(7)));
    }

    #[test]
    fn kind_parsing_is_case_insensitive() {
        assert_eq!("linkedin".parse::<SourceKind>(), Ok(SourceKind::LinkedIn));
        assert_eq!("Twitter".parse::<SourceKind>(), Ok(SourceKind::X));
        assert!("myspace".parse::<SourceKind>().is_err());
    }

    #[test]
    fn success_ratio_never_divides_by_zero() {
        let st = MonitoringStatus {
            source_id: "X".into(),
            url: "https://x.com/example".into(),
            last_fingerprint: None,
            last_content_preview: None,
            last_source_url: None,
            last_checked_at: None,
            has_new_content: false,
            last_error: None,
            check_count: 0,
            success_count: 0,
        };
        assert_eq!(st.success_ratio(), 0.0);
    }
}
