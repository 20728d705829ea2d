// src/extract/platforms/linkedin.rs
use chrono::{DateTime, Utc};
use scraper::ElementRef;
use std::time::Duration;

use super::{element_text, select_in, SourceStrategy};
use crate::fingerprint::{day_salt, fingerprint};
use crate::model::{Snapshot, SourceKind};

pub struct LinkedIn;

impl SourceStrategy for LinkedIn {
    fn kind(&self) -> SourceKind {
        SourceKind::LinkedIn
    }

    fn post_selectors(&self) -> &'static [&'static str] {
        &[".feed-shared-update-v2", r#"[data-urn*="update"]"#]
    }

    fn render_wait(&self) -> Duration {
        Duration::from_millis(3000)
    }

    // 999 is LinkedIn's bot wall; 302 bounces to the login page.
    fn blocked_statuses(&self) -> &'static [u16] {
        &[999, 302, 403]
    }

    fn fallback_delay(&self) -> Duration {
        Duration::from_secs(2)
    }

    fn read_post(&self, post: ElementRef<'_>, page_url: &str, now: DateTime<Utc>) -> Snapshot {
        let content = select_in(post, ".feed-shared-text")
            .and_then(element_text)
            .unwrap_or_default();
        let fp = fingerprint(&content, &day_salt(now));
        let preview = if content.is_empty() {
            "LinkedIn post found"
        } else {
            content.as_str()
        };
        Snapshot::new(fp, preview, page_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PAGE: &str = r#"<html><body>
        <div data-urn="urn:li:activity:update:1"><span>old style</span></div>
        <div class="feed-shared-update-v2">
            <div class="feed-shared-text">  We are hiring
                engineers! </div>
        </div></body></html>"#;

    #[test]
    fn reads_first_post_text() {
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        let url = "https://www.linkedin.com/company/acme/";
        let snap = LinkedIn.extract_primary(PAGE, url, now).unwrap();
        assert_eq!(snap.content_preview, "We are hiring engineers!");
        assert_eq!(snap.source_url, url);
        assert_eq!(snap.fingerprint, fingerprint("We are hiring engineers!", "2025-09-06"));
    }

    #[test]
    fn post_without_text_gets_placeholder_preview() {
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        let html = r#"<div data-urn="urn:li:activity:update:7"></div>"#;
        let snap = LinkedIn.extract_primary(html, "https://l.test", now).unwrap();
        assert_eq!(snap.content_preview, "LinkedIn post found");
    }

    #[test]
    fn page_without_posts_yields_nothing() {
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        assert!(LinkedIn
            .extract_primary("<html><body>Sign in</body></html>", "https://l.test", now)
            .is_none());
    }
}
