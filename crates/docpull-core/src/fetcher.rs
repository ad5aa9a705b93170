//! HTTP fetching for probes, sitemaps, and page scraping.
//!
//! [`Fetcher`] is the crate's sole I/O dependency: every network touch in the
//! analyzer, sitemap resolver, converter, and orchestrator goes through it.
//! That keeps timeout policy and the user agent in one place and lets tests
//! point the whole pipeline at a wiremock server.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::{Error, Result};

/// Default timeout for a single GET/HEAD request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client wrapper used by all network-touching components.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a fetcher with the default 30 second request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    /// Creates a fetcher with a custom request timeout (primarily for tests).
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("docpull/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }

    /// Fetches a URL and returns the response body as text.
    ///
    /// Non-2xx statuses are errors: 404 maps to [`Error::NotFound`] with the
    /// URL in the message, other failures to [`Error::Network`]. Callers in
    /// the extraction pipeline catch these per page / per probe.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            if status == StatusCode::NOT_FOUND {
                return Err(Error::NotFound(format!("Resource not found at '{url}'")));
            }
            return Err(Error::NotFound(format!(
                "Request to '{url}' failed with status {status}"
            )));
        }

        let body = response.text().await?;
        debug!(url = %url, bytes = body.len(), "Fetched page");
        Ok(body)
    }

    /// Checks whether a URL exists using a HEAD request with a GET fallback.
    ///
    /// Some servers reject HEAD outright (405) or answer it unreliably; in
    /// that case a GET is issued and the body discarded. Network errors count
    /// as "does not exist" — probing must never raise.
    pub async fn head_ok(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) if response.status() == StatusCode::METHOD_NOT_ALLOWED => {
                self.get_ok(url).await
            }
            Ok(_) => false,
            Err(e) => {
                debug!(url = %url, error = %e, "HEAD probe failed, trying GET");
                self.get_ok(url).await
            }
        }
    }

    /// Checks whether a GET on the URL answers 2xx.
    pub async fn get_ok(&self, url: &str) -> bool {
        self.client
            .get(url)
            .send()
            .await
            .is_ok_and(|response| response.status().is_success())
    }

    /// Returns the `Link` response header of a URL, if the request succeeds
    /// and the header is present.
    pub async fn link_header(&self, url: &str) -> Option<String> {
        let response = self.client.get(url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(std::string::ToString::to_string)
    }
}
