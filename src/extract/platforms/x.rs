// src/extract/platforms/x.rs
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::ElementRef;
use std::time::Duration;

use super::{absolutize, element_text, select_in, SourceStrategy};
use crate::fingerprint::{day_salt, fingerprint};
use crate::model::{Snapshot, SourceKind};

const ORIGIN: &str = "https://x.com";

pub struct X;

/// Numeric id from a `/status/<id>` link.
fn status_id(url: &str) -> Option<&str> {
    static RE_STATUS: OnceCell<Regex> = OnceCell::new();
    let re = RE_STATUS.get_or_init(|| Regex::new(r"/status/(\d+)").unwrap());
    re.captures(url).and_then(|c| c.get(1)).map(|m| m.as_str())
}

impl SourceStrategy for X {
    fn kind(&self) -> SourceKind {
        SourceKind::X
    }

    fn post_selectors(&self) -> &'static [&'static str] {
        &[r#"[data-testid="tweet"]"#]
    }

    fn render_wait(&self) -> Duration {
        Duration::from_millis(4000)
    }

    fn read_post(&self, post: ElementRef<'_>, page_url: &str, now: DateTime<Utc>) -> Snapshot {
        let content = select_in(post, r#"[data-testid="tweetText"]"#)
            .and_then(element_text)
            .unwrap_or_default();
        let tweet_url = select_in(post, r#"a[href*="/status/"]"#)
            .and_then(|a| a.value().attr("href"))
            .map(|href| absolutize(href.trim(), ORIGIN))
            .unwrap_or_else(|| page_url.to_string());

        // A status id is stable on its own, no time salt needed.
        let fp = match status_id(&tweet_url) {
            Some(id) => fingerprint(id, ""),
            None => fingerprint(&content, &day_salt(now)),
        };
        let preview = if content.is_empty() {
            "Tweet found"
        } else {
            content.as_str()
        };
        Snapshot::new(fp, preview, tweet_url)
    }
}
