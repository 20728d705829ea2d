// src/config/monitor.rs
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigurationError;
use crate::model::{SourceConfig, SourceKind};

pub const DEFAULT_MONITOR_CONFIG_PATH: &str = "config/monitor.toml";
pub const ENV_MONITOR_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";

const ENV_CHECK_INTERVAL: &str = "CHECK_INTERVAL_SECS";
const ENV_DATABASE_PATH: &str = "DATABASE_PATH";
const ENV_RENDERER_URL: &str = "RENDERER_URL";
const ENV_RENDERER_TOKEN: &str = "RENDERER_TOKEN";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn default_check_interval_secs() -> u64 {
    300
}
fn default_request_timeout_secs() -> u64 {
    15
}
fn default_render_timeout_secs() -> u64 {
    30
}
fn default_source_pause_ms() -> u64 {
    2000
}
fn default_database_path() -> String {
    "social_monitor.db".to_string()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_true() -> bool {
    true
}

/// Headless rendering service (Browserless-compatible).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RendererConfig {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SourceEntry {
    kind: String,
    url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default = "default_check_interval_secs")]
    check_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_render_timeout_secs")]
    render_timeout_secs: u64,
    #[serde(default = "default_source_pause_ms")]
    source_pause_ms: u64,
    #[serde(default = "default_database_path")]
    database_path: String,
    #[serde(default = "default_user_agent")]
    user_agent: String,
    #[serde(default = "default_true")]
    notify_on_degraded: bool,
    #[serde(default)]
    renderer: Option<RendererConfig>,
    #[serde(default)]
    sources: Vec<SourceEntry>,
}

/// Engine settings. Read once at startup, never reloaded.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub check_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub render_timeout_secs: u64,
    /// Pause between two sources inside one cycle.
    pub source_pause_ms: u64,
    pub database_path: String,
    pub user_agent: String,
    /// Whether changes seen through a degraded (blocked) snapshot notify.
    pub notify_on_degraded: bool,
    pub renderer: Option<RendererConfig>,
    /// In configured order; cycles visit sources in this order.
    pub sources: Vec<SourceConfig>,
}

impl MonitorConfig {
    /// Config with defaults and the given sources; used by tools and tests.
    pub fn with_sources(sources: Vec<SourceConfig>) -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            render_timeout_secs: default_render_timeout_secs(),
            source_pause_ms: default_source_pause_ms(),
            database_path: default_database_path(),
            user_agent: default_user_agent(),
            notify_on_degraded: true,
            renderer: None,
            sources,
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn source_pause(&self) -> Duration {
        Duration::from_millis(self.source_pause_ms)
    }

    /// Parse TOML text, without environment overrides.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigurationError> {
        let raw: RawConfig = toml::from_str(s)?;
        let sources = raw
            .sources
            .into_iter()
            .map(|e| {
                let kind: SourceKind = e
                    .kind
                    .parse()
                    .map_err(|_| ConfigurationError::UnknownKind(e.kind.clone()))?;
                Ok(SourceConfig::new(kind, e.url.trim()))
            })
            .collect::<Result<Vec<_>, ConfigurationError>>();

        let cfg = Self {
            check_interval_secs: raw.check_interval_secs,
            request_timeout_secs: raw.request_timeout_secs,
            render_timeout_secs: raw.render_timeout_secs,
            source_pause_ms: raw.source_pause_ms,
            database_path: raw.database_path,
            user_agent: raw.user_agent,
            notify_on_degraded: raw.notify_on_degraded,
            renderer: raw.renderer.filter(|r| !r.url.trim().is_empty()),
            sources: sources?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load using env var + fallback:
    /// 1) $MONITOR_CONFIG_PATH
    /// 2) config/monitor.toml
    pub fn load_default() -> Result<Self, ConfigurationError> {
        let path = std::env::var(ENV_MONITOR_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MONITOR_CONFIG_PATH));
        Self::load_from(&path)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigurationError> {
        if let Ok(raw) = std::env::var(ENV_CHECK_INTERVAL) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigurationError::InvalidEnv {
                name: ENV_CHECK_INTERVAL,
                value: raw.clone(),
            })?;
            self.check_interval_secs = secs;
        }
        if let Ok(p) = std::env::var(ENV_DATABASE_PATH) {
            if !p.trim().is_empty() {
                self.database_path = p;
            }
        }
        if let Ok(url) = std::env::var(ENV_RENDERER_URL) {
            if !url.trim().is_empty() {
                self.renderer = Some(RendererConfig {
                    url,
                    token: std::env::var(ENV_RENDERER_TOKEN).ok(),
                });
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.check_interval_secs == 0 {
            return Err(ConfigurationError::InvalidInterval);
        }
        if self.sources.is_empty() {
            return Err(ConfigurationError::NoSources);
        }
        let mut seen = HashSet::new();
        for s in &self.sources {
            if !seen.insert(s.kind) {
                return Err(ConfigurationError::DuplicateSource(s.kind));
            }
            let ok = reqwest::Url::parse(&s.url)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !ok {
                return Err(ConfigurationError::InvalidUrl {
                    kind: s.kind,
                    url: s.url.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        check_interval_secs = 120
        source_pause_ms = 0

        [renderer]
        url = "http://localhost:3000"

        [[sources]]
        kind = "X"
        url = "https://x.com/acme"

        [[sources]]
        kind = "linkedin"
        url = " https://www.linkedin.com/company/acme/ "
    "#;

    #[test]
    fn parses_sources_in_order_with_defaults() {
        let cfg = MonitorConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.check_interval(), Duration::from_secs(120));
        assert_eq!(cfg.request_timeout_secs, 15);
        assert_eq!(cfg.database_path, "social_monitor.db");
        assert!(cfg.notify_on_degraded);
        assert_eq!(
            cfg.renderer.as_ref().map(|r| r.url.as_str()),
            Some("http://localhost:3000")
        );
        let kinds: Vec<_> = cfg.sources.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SourceKind::X, SourceKind::LinkedIn]);
        assert_eq!(cfg.sources[1].url, "https://www.linkedin.com/company/acme/");
    }

    #[test]
    fn rejects_duplicates_bad_urls_and_empty_lists() {
        let dup = r#"
            [[sources]]
            kind = "X"
            url = "https://x.com/a"
            [[sources]]
            kind = "x"
            url = "https://x.com/b"
        "#;
        assert!(matches!(
            MonitorConfig::from_toml_str(dup),
            Err(ConfigurationError::DuplicateSource(SourceKind::X))
        ));

        let bad = r#"
            [[sources]]
            kind = "TikTok"
            url = "ftp://tiktok.com/@a"
        "#;
        assert!(matches!(
            MonitorConfig::from_toml_str(bad),
            Err(ConfigurationError::InvalidUrl { .. })
        ));

        assert!(matches!(
            MonitorConfig::from_toml_str(""),
            Err(ConfigurationError::NoSources)
        ));

        let unknown = r#"
            [[sources]]
            kind = "MySpace"
            url = "https://myspace.com/a"
        "#;
        assert!(matches!(
            MonitorConfig::from_toml_str(unknown),
            Err(ConfigurationError::UnknownKind(k)) if k == "MySpace"
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let s = r#"
            check_interval_secs = 0
            [[sources]]
            kind = "X"
            url = "https://x.com/a"
        "#;
        assert!(matches!(
            MonitorConfig::from_toml_str(s),
            Err(ConfigurationError::InvalidInterval)
        ));
    }
}
