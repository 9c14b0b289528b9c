//! Plain HTTP downloads of release assets.
//!
//! Release asset URLs are ordinary public downloads, separate from the
//! authenticated host API. The trait exists so workflow tests can hand out
//! canned documents instead of touching the network.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Result type for asset downloads.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors raised while downloading a release asset.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("GET {url} returned invalid JSON: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Downloader for release assets.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Download and parse a JSON document.
    async fn fetch_json(&self, url: &str) -> FetchResult<Value>;

    /// Download raw bytes.
    async fn fetch_bytes(&self, url: &str) -> FetchResult<Vec<u8>>;
}

/// [`AssetFetcher`] over a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }

    async fn get(&self, url: &str) -> FetchResult<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", concat!("registrar/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> FetchResult<Value> {
        let bytes = self.get(url).await?.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|source| FetchError::Json { url: url.to_string(), source })
    }

    async fn fetch_bytes(&self, url: &str) -> FetchResult<Vec<u8>> {
        Ok(self.get(url).await?.bytes().await?.to_vec())
    }
}
