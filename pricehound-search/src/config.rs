//! Search configuration with production defaults.
//!
//! [`SearchConfig`] holds one block per marketplace plus the cache TTL and
//! the caller-level deadline. Origins are plain strings so tests can point
//! each source at a local mock server.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::SearchError;

/// Desktop Chrome fingerprint shared by both sources.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

/// Top-level configuration for an [`Orchestrator`](crate::orchestrator::Orchestrator).
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Ozon source settings.
    pub ozon: OzonConfig,
    /// Wildberries source settings.
    pub wildberries: WildberriesConfig,
    /// Lifetime of a cached result list.
    pub cache_ttl_seconds: u64,
    /// Upper bound on one cache-miss search. When it elapses both sources
    /// are cancelled and whatever finished is returned.
    pub search_deadline_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            ozon: OzonConfig::default(),
            wildberries: WildberriesConfig::default(),
            cache_ttl_seconds: 3600,
            search_deadline_seconds: 90,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.cache_ttl_seconds == 0 {
            return Err(SearchError::Config(
                "cache_ttl_seconds must be greater than 0".into(),
            ));
        }
        if self.search_deadline_seconds == 0 {
            return Err(SearchError::Config(
                "search_deadline_seconds must be greater than 0".into(),
            ));
        }
        self.ozon.validate()?;
        self.wildberries.validate()
    }

    /// The cache TTL as a [`Duration`].
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// The search deadline as a [`Duration`].
    pub fn search_deadline(&self) -> Duration {
        Duration::from_secs(self.search_deadline_seconds)
    }
}

/// Settings for the Ozon source.
#[derive(Debug, Clone)]
pub struct OzonConfig {
    /// Storefront origin, used for warm-up, `Origin`, and relative item links.
    pub www_origin: String,
    /// API origin hosting `composer-api.bx`.
    pub api_origin: String,
    /// Browser-exported cookie snapshot (JSON array). Required.
    pub cookies_path: PathBuf,
    /// Optional file holding one upstream proxy URL.
    pub proxy_path: Option<PathBuf>,
    /// Total request attempts, redirect hops included.
    pub max_attempts: u32,
    /// Random delay range `(min, max)` in milliseconds before every attempt.
    pub attempt_delay_ms: (u64, u64),
    /// Extra pause after following a redirect, in milliseconds.
    pub redirect_pause_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// User-Agent sent with every request.
    pub user_agent: String,
}

impl Default for OzonConfig {
    fn default() -> Self {
        Self {
            www_origin: "https://www.ozon.ru".into(),
            api_origin: "https://api.ozon.ru".into(),
            cookies_path: PathBuf::from("cookies.json"),
            proxy_path: Some(PathBuf::from("proxy.txt")),
            max_attempts: 2,
            attempt_delay_ms: (3_000, 10_000),
            redirect_pause_ms: 2_000,
            timeout_seconds: 15,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

impl OzonConfig {
    fn validate(&self) -> Result<(), SearchError> {
        if self.www_origin.is_empty() || self.api_origin.is_empty() {
            return Err(SearchError::Config("ozon origins must not be empty".into()));
        }
        if self.max_attempts == 0 {
            return Err(SearchError::Config(
                "ozon max_attempts must be greater than 0".into(),
            ));
        }
        if self.attempt_delay_ms.0 > self.attempt_delay_ms.1 {
            return Err(SearchError::Config(
                "ozon attempt_delay_ms min must be <= max".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "ozon timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for the Wildberries source.
#[derive(Debug, Clone)]
pub struct WildberriesConfig {
    /// Storefront origin, used for warm-up, `Origin`, and detail links.
    pub www_origin: String,
    /// Search API origin.
    pub search_origin: String,
    /// Optional file holding one upstream proxy URL.
    pub proxy_path: Option<PathBuf>,
    /// Total request attempts.
    pub max_attempts: u32,
    /// Fixed pause between failed attempts, in milliseconds.
    pub backoff_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// Issue a best-effort request for every derived image URL.
    pub probe_images: bool,
    /// User-Agent sent with every request.
    pub user_agent: String,
}

impl Default for WildberriesConfig {
    fn default() -> Self {
        Self {
            www_origin: "https://www.wildberries.ru".into(),
            search_origin: "https://search.wb.ru".into(),
            proxy_path: Some(PathBuf::from("proxy.txt")),
            max_attempts: 30,
            backoff_ms: 2_000,
            timeout_seconds: 15,
            probe_images: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.6045.105 Safari/537.36".into(),
        }
    }
}

impl WildberriesConfig {
    fn validate(&self) -> Result<(), SearchError> {
        if self.www_origin.is_empty() || self.search_origin.is_empty() {
            return Err(SearchError::Config(
                "wildberries origins must not be empty".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(SearchError::Config(
                "wildberries max_attempts must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "wildberries timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
