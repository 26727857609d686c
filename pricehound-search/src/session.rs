//! Per-call marketplace sessions.
//!
//! A [`SourceSession`] bundles a cookie jar, an HTTP client bound to it, and
//! the warm-up state. Each source opens a fresh session for every
//! [`fetch`](crate::source::ProductSource::fetch) call and drops it
//! afterwards, so cookies never leak between marketplaces or queries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::SearchError;
use crate::http::{self, ClientOptions};
use crate::retry;
use crate::types::Marketplace;

/// One cookie from a browser extension export (EditThisCookie/Cookie-Editor
/// format).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub expiration_date: f64,
    #[serde(default)]
    pub same_site: String,
    #[serde(default)]
    pub session: bool,
}

impl BrowserCookie {
    /// Render as a `Set-Cookie` header value for the cookie jar.
    pub fn to_set_cookie(&self) -> String {
        let mut header = format!("{}={}", self.name, self.value);
        if !self.domain.is_empty() {
            header.push_str("; Domain=");
            header.push_str(&self.domain);
        }
        if !self.path.is_empty() {
            header.push_str("; Path=");
            header.push_str(&self.path);
        }
        if self.secure {
            header.push_str("; Secure");
        }
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        match self.same_site.as_str() {
            "no_restriction" => header.push_str("; SameSite=None"),
            "lax" => header.push_str("; SameSite=Lax"),
            "strict" => header.push_str("; SameSite=Strict"),
            _ => {}
        }
        if let Some(expires) = self.expires() {
            header.push_str("; Expires=");
            header.push_str(&expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string());
        }
        header
    }

    /// Expiry instant, only for persistent cookies with a positive date.
    fn expires(&self) -> Option<DateTime<Utc>> {
        if self.session || self.expiration_date <= 0.0 {
            return None;
        }
        DateTime::from_timestamp(self.expiration_date as i64, 0)
    }
}

/// Read a browser cookie export.
///
/// # Errors
///
/// Returns [`SearchError::Session`] if the file is missing, unreadable, or
/// not a JSON array of cookies.
pub async fn load_cookie_snapshot(path: &Path) -> Result<Vec<BrowserCookie>, SearchError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        SearchError::Session(format!(
            "cannot read cookie snapshot {}: {e}",
            path.display()
        ))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        SearchError::Session(format!(
            "cannot parse cookie snapshot {}: {e}",
            path.display()
        ))
    })
}

/// Read the optional upstream proxy.
///
/// An absent or empty file means a direct connection. Content that reqwest
/// cannot use as a proxy URL is ignored.
pub async fn load_proxy(path: Option<&Path>) -> Option<reqwest::Proxy> {
    let path = path?;
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "proxy file unreadable, connecting directly");
            return None;
        }
    };
    let proxy_url = raw.trim();
    if proxy_url.is_empty() {
        return None;
    }
    match reqwest::Proxy::all(proxy_url) {
        Ok(proxy) => {
            tracing::debug!("using upstream proxy");
            Some(proxy)
        }
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed proxy URL");
            None
        }
    }
}

/// Everything needed to open a [`SourceSession`].
pub struct SessionOptions {
    /// Which marketplace the session talks to.
    pub marketplace: Marketplace,
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Optional proxy file.
    pub proxy_path: Option<PathBuf>,
    /// Cookies to seed, installed for every origin in `cookie_origins`.
    pub cookies: Vec<BrowserCookie>,
    /// Origins the seeded cookies apply to.
    pub cookie_origins: Vec<Url>,
}

/// Exclusively owned per-call state for one marketplace.
pub struct SourceSession {
    marketplace: Marketplace,
    client: reqwest::Client,
}

impl SourceSession {
    /// Build the jar, seed it, resolve the proxy, and construct the client.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Session`] if the HTTP client cannot be built.
    pub async fn open(options: SessionOptions) -> Result<Self, SearchError> {
        let jar = Arc::new(seed_jar(&options.cookies, &options.cookie_origins));
        tracing::debug!(
            marketplace = %options.marketplace,
            cookies = options.cookies.len(),
            "session cookies seeded"
        );

        let proxy = load_proxy(options.proxy_path.as_deref()).await;
        let client = http::build_client(ClientOptions {
            user_agent: options.user_agent,
            timeout: options.timeout,
            jar,
            proxy,
        })?;

        Ok(Self {
            marketplace: options.marketplace,
            client,
        })
    }

    /// The session's HTTP client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Load the storefront home page so the anti-bot layer sets its cookies.
    ///
    /// The body is drained and discarded; any status is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] on transport failure, or
    /// [`SearchError::Cancelled`].
    pub async fn warm_up(
        &self,
        home_url: &str,
        headers: HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<(), SearchError> {
        let marketplace = self.marketplace;
        let request = self.client.get(home_url).headers(headers).send();
        let response = retry::until_cancelled(cancel, marketplace, request)
            .await?
            .map_err(|e| SearchError::Http(format!("{marketplace} warm-up failed: {e}")))?;
        let status = response.status();
        retry::until_cancelled(cancel, marketplace, response.bytes())
            .await?
            .map_err(|e| SearchError::Http(format!("{marketplace} warm-up read failed: {e}")))?;

        tracing::debug!(%marketplace, status = status.as_u16(), "warm-up complete");
        Ok(())
    }
}

/// Jar holding every cookie once per origin.
fn seed_jar(cookies: &[BrowserCookie], origins: &[Url]) -> Jar {
    let jar = Jar::default();
    for cookie in cookies {
        let header = cookie.to_set_cookie();
        for origin in origins {
            jar.add_cookie_str(&header, origin);
        }
    }
    jar
}
