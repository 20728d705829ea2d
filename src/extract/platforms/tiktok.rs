// src/extract/platforms/tiktok.rs
use chrono::{DateTime, Utc};
use scraper::ElementRef;
use std::time::Duration;

use super::{absolutize, select_in, SourceStrategy};
use crate::fingerprint::{day_salt, fingerprint};
use crate::model::{Snapshot, SourceKind};

const ORIGIN: &str = "https://www.tiktok.com";

pub struct TikTok;

impl SourceStrategy for TikTok {
    fn kind(&self) -> SourceKind {
        SourceKind::TikTok
    }

    fn post_selectors(&self) -> &'static [&'static str] {
        &[r#"[data-e2e="user-post-item"]"#, r#"div[class*="video"]"#]
    }

    fn render_wait(&self) -> Duration {
        Duration::from_millis(5000)
    }

    /// Video posts carry no text worth keeping; the link identifies the post.
    fn read_post(&self, post: ElementRef<'_>, page_url: &str, now: DateTime<Utc>) -> Snapshot {
        let video_url = select_in(post, "a[href]")
            .and_then(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(|href| absolutize(href, ORIGIN))
            .unwrap_or_else(|| page_url.to_string());
        let fp = fingerprint(&video_url, &day_salt(now));
        Snapshot::new(fp, "New TikTok video available", video_url)
    }
}
