//! Instance metadata service client.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Metadata endpoints answer locally; anything slower means we are not on
/// the platform we think we are.
const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Thin wrapper over `reqwest` for link-local metadata endpoints.
pub struct MetadataClient {
    client: reqwest::Client,
    base: String,
    headers: Vec<(&'static str, String)>,
}

impl MetadataClient {
    /// Client rooted at `base`, sending `headers` with every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base: &str, headers: Vec<(&'static str, String)>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(METADATA_TIMEOUT)
            .no_proxy()
            .build()
            .context("building metadata HTTP client")?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            headers,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        extra: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        debug!(%method, %url, "metadata request");
        let mut request = self.client.request(method, &url);
        for (name, value) in &self.headers {
            request = request.header(*name, value);
        }
        for (name, value) in extra {
            request = request.header(*name, *value);
        }
        request
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .with_context(|| format!("metadata request {url} failed"))
    }

    /// GET `path` as trimmed text.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn text(&self, path: &str, extra: &[(&str, &str)]) -> Result<String> {
        let body = self.send(Method::GET, path, extra).await?.text().await?;
        Ok(body.trim().to_string())
    }

    /// GET `path` and decode it as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status or
    /// undecodable JSON.
    pub async fn json<T: DeserializeOwned>(&self, path: &str, extra: &[(&str, &str)]) -> Result<T> {
        self.send(Method::GET, path, extra)
            .await?
            .json()
            .await
            .with_context(|| format!("decoding {}", self.url(path)))
    }

    /// PUT to `path` with an empty body, returning the trimmed response text.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn put_text(&self, path: &str, extra: &[(&str, &str)]) -> Result<String> {
        let body = self.send(Method::PUT, path, extra).await?.text().await?;
        Ok(body.trim().to_string())
    }

    /// Whether GET `path` succeeds at all.
    pub async fn reachable(&self, path: &str, extra: &[(&str, &str)]) -> bool {
        self.send(Method::GET, path, extra).await.is_ok()
    }
}

/// Last `/`-separated segment: `projects/1/zones/europe-west1-b` → `europe-west1-b`.
#[must_use]
pub fn last_segment(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}
