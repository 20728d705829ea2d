// src/extract/platforms/facebook.rs
use chrono::{DateTime, Utc};
use scraper::ElementRef;
use std::time::Duration;

use super::{element_text, select_in, SourceStrategy};
use crate::fingerprint::{day_salt, fingerprint};
use crate::model::{Snapshot, SourceKind};

pub struct Facebook;

impl SourceStrategy for Facebook {
    fn kind(&self) -> SourceKind {
        SourceKind::Facebook
    }

    fn post_selectors(&self) -> &'static [&'static str] {
        &[r#"[role="article"]"#, r#"div[data-pagelet*="FeedUnit"]"#]
    }

    fn render_wait(&self) -> Duration {
        Duration::from_millis(4000)
    }

    fn read_post(&self, post: ElementRef<'_>, page_url: &str, now: DateTime<Utc>) -> Snapshot {
        // Ad-preview message first, then the first auto-direction text block.
        let content = select_in(post, r#"[data-ad-preview="message"]"#)
            .and_then(element_text)
            .or_else(|| select_in(post, r#"div[dir="auto"]"#).and_then(element_text))
            .unwrap_or_default();
        let fp = fingerprint(&content, &day_salt(now));
        let preview = if content.is_empty() {
            "Facebook post found"
        } else {
            content.as_str()
        };
        Snapshot::new(fp, preview, page_url)
    }
}
