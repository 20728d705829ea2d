// src/extract/platforms/mod.rs
//! Per-platform extraction strategies.
//!
//! Every `SourceKind` maps to exactly one `SourceStrategy`. The primary path
//! reads rendered HTML through CSS selector candidates tried in priority order;
//! the fallback path interprets a plain fetch. Adding a platform means adding a
//! variant and a strategy, nothing else.

pub mod facebook;
pub mod linkedin;
pub mod tiktok;
pub mod x;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use super::fetch::{collapse_whitespace, visible_text, FetchedPage};
use crate::error::ExtractionFailure;
use crate::fingerprint::{fingerprint, hour_salt};
use crate::model::{Snapshot, SourceKind};

/// How much visible page text the fallback fingerprints.
pub const FALLBACK_TEXT_WINDOW: usize = 1000;

pub trait SourceStrategy: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Post container selectors, highest priority first.
    fn post_selectors(&self) -> &'static [&'static str];

    /// Time the renderer lets client-side scripts run before capturing HTML.
    fn render_wait(&self) -> Duration;

    /// Build a snapshot from the first post container found on the page.
    fn read_post(&self, post: ElementRef<'_>, page_url: &str, now: DateTime<Utc>) -> Snapshot;

    /// Plain-fetch statuses meaning "blocked" rather than "broken".
    fn blocked_statuses(&self) -> &'static [u16] {
        &[]
    }

    /// Politeness delay before a plain fetch.
    fn fallback_delay(&self) -> Duration {
        Duration::ZERO
    }

    /// `None` when no selector candidate matched anything.
    fn extract_primary(&self, html: &str, page_url: &str, now: DateTime<Utc>) -> Option<Snapshot> {
        let doc = Html::parse_document(html);
        let post = first_match(&doc, self.post_selectors())?;
        Some(self.read_post(post, page_url, now))
    }

    fn extract_fallback(
        &self,
        page: &FetchedPage,
        page_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Snapshot, ExtractionFailure> {
        let kind = self.kind();

        if self.blocked_statuses().contains(&page.status) {
            tracing::warn!(
                target: "extract",
                source = %kind,
                status = page.status,
                "plain fetch blocked; synthesizing degraded snapshot"
            );
            let marker = format!("{kind} check at {}", now.format("%Y-%m-%d %H"));
            return Ok(Snapshot::new(
                fingerprint(&marker, ""),
                &format!("{kind} monitoring active (access limited)"),
                page_url,
            )
            .degraded());
        }

        if page.status != 200 {
            return Err(ExtractionFailure::HttpStatus {
                status: page.status,
            });
        }

        let text: String = visible_text(&page.body)
            .chars()
            .take(FALLBACK_TEXT_WINDOW)
            .collect();
        let n = text.chars().count();
        Ok(Snapshot::new(
            fingerprint(&text, &hour_salt(now)),
            &format!("Page content checked for {kind} - {n} characters found"),
            page_url,
        ))
    }
}

pub fn strategy_for(kind: SourceKind) -> &'static dyn SourceStrategy {
    match kind {
        SourceKind::LinkedIn => &linkedin::LinkedIn,
        SourceKind::TikTok => &tiktok::TikTok,
        SourceKind::Facebook => &facebook::Facebook,
        SourceKind::X => &x::X,
    }
}

/// First element of the first candidate selector that matches at all.
pub(crate) fn first_match<'a>(doc: &'a Html, candidates: &[&str]) -> Option<ElementRef<'a>> {
    candidates.iter().find_map(|css| {
        let sel = Selector::parse(css).ok()?;
        doc.select(&sel).next()
    })
}

/// First descendant of `scope` matching `css`.
pub(crate) fn select_in<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(css).ok()?;
    scope.select(&sel).next()
}

/// Whitespace-collapsed text of an element; `None` when empty.
pub(crate) fn element_text(el: ElementRef<'_>) -> Option<String> {
    let text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
    (!text.is_empty()).then_some(text)
}

/// Resolve a possibly relative `href` against a platform origin.
pub(crate) fn absolutize(href: &str, origin: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{origin}{href}")
    } else {
        format!("{origin}/{href}")
    }
}
