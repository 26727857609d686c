//! HTTP client construction and request helpers shared by the sources.
//!
//! Each source call builds its own [`reqwest::Client`] around its own cookie
//! jar; nothing here is process-wide. Redirects are never followed
//! automatically because Ozon rewrites `Location` before following it.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::SearchError;

/// Longest response body excerpt written to the log on unexpected status.
pub const BODY_SNIPPET_CHARS: usize = 1000;

/// Inputs for [`build_client`].
pub struct ClientOptions {
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Cookie store owned by the calling session.
    pub jar: Arc<Jar>,
    /// Upstream proxy. TLS verification is disabled when set.
    pub proxy: Option<reqwest::Proxy>,
}

/// Build a [`reqwest::Client`] for one source session.
///
/// The client has:
/// - the session's cookie jar
/// - no automatic redirects
/// - either the configured proxy (with certificate checks off, as the
///   marketplace proxies terminate TLS) or a direct connection that ignores
///   `HTTP(S)_PROXY` from the environment
///
/// # Errors
///
/// Returns [`SearchError::Session`] if the client cannot be constructed.
pub fn build_client(options: ClientOptions) -> Result<reqwest::Client, SearchError> {
    let builder = reqwest::Client::builder()
        .cookie_provider(options.jar)
        .timeout(options.timeout)
        .user_agent(options.user_agent)
        .redirect(reqwest::redirect::Policy::none());

    let builder = match options.proxy {
        Some(proxy) => builder.proxy(proxy).danger_accept_invalid_certs(true),
        None => builder.no_proxy(),
    };

    builder
        .build()
        .map_err(|e| SearchError::Session(format!("failed to build HTTP client: {e}")))
}

/// Build a [`HeaderMap`] from static name/value pairs, skipping any pair
/// that is not a valid header.
pub fn header_map(pairs: &[(&'static str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(name), value);
            }
            Err(_) => tracing::debug!(header = name, "skipping invalid header value"),
        }
    }
    headers
}

/// First [`BODY_SNIPPET_CHARS`] characters of a response body.
pub fn snippet(body: &str) -> &str {
    match body.char_indices().nth(BODY_SNIPPET_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// `application/x-www-form-urlencoded` escaping, spaces as `+`.
pub fn escape_query(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes()).collect()
}
