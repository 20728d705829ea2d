// src/extract/fetch.rs
//! Fallback extraction path: one plain HTTP GET, no script execution.

use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::redirect::Policy;
use scraper::Html;
use std::time::Duration;

use crate::error::{ConfigurationError, ExtractionFailure};

/// Raw response of a plain fetch; interpreted per source kind.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

pub struct PlainFetcher {
    client: reqwest::Client,
}

impl PlainFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ConfigurationError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        // Redirects are a signal (login walls), so they are never followed.
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigurationError::HttpClient(e.to_string()))?;

        Ok(Self { client })
    }

    pub async fn get(&self, url: &str) -> Result<FetchedPage, ExtractionFailure> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(FetchedPage { status, body })
    }
}

/// Visible text of an HTML document: `script`/`style`/`noscript` dropped,
/// whitespace collapsed.
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();
    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript"))
        });
        if hidden {
            continue;
        }
        let t = text.trim();
        if !t.is_empty() {
            parts.push(t);
        }
    }
    collapse_whitespace(&parts.join(" "))
}

pub fn collapse_whitespace(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(s, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_and_styles_are_stripped() {
        let html = r#"<html><head><style>body { color: red }</style>
            <script>var tracking = 1;</script></head>
            <body><h1>Acme</h1>  <p>Latest   news&amp;views</p>
            <noscript>enable js</noscript></body></html>"#;
        assert_eq!(visible_text(html), "Acme Latest news&views");
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
    }
}
