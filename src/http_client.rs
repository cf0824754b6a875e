//! HTTP transport shared by all resolvers.
//!
//! Features:
//! - Connection pooling with keep-alive
//! - TLS via rustls, Brotli/Gzip/Deflate auto-negotiated
//! - Cookie store, so session cookies survive between hops of one pipeline
//! - Desktop browser User-Agent (the catalogs reject obvious bots)
//!
//! Status codes outside 2xx become [`ResolveError::Status`]. There is no retry.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::error::{ResolveError, Result};

/// User-Agent sent on every request.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/89.0.4389.90 Safari/537.36";

/// Header name/value pairs added to a single request.
pub type Headers<'a> = &'a [(&'a str, &'a str)];

/// HTTP client used by every resolver
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new client with browser-like defaults
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/json;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            // Keep connections alive for reuse
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch a URL and return the body as text
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn fetch_text(&self, url: &str, headers: Headers<'_>) -> Result<String> {
        debug!("Fetching");
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await?;

        let status = response.status();
        info!(status = %status, version = ?response.version(), "Response received");

        if !status.is_success() {
            return Err(ResolveError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }

    /// Fetch a URL and decode the body as JSON
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: Headers<'_>,
    ) -> Result<T> {
        let body = self.fetch_text(url, headers).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}
