//! Asset fetcher
//!
//! Downloads the binary asset behind a resolved asset URL. The request carries
//! the session's cookies and the viewer page as referer, since the source only
//! serves assets to the session that opened the viewer.

use crate::renderer::Cookie;
use crate::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::header::{COOKIE, REFERER};
use reqwest::Client;
use std::time::Duration;

/// A single asset download
#[derive(Debug, Clone, Default)]
pub struct AssetRequest {
    pub url: String,

    /// Page the asset URL was found on
    pub referer: Option<String>,

    /// Cookies copied from the page session
    pub cookies: Vec<Cookie>,
}

/// Raw response to an asset request
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchedAsset {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches asset bytes; validation is left to the caller
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, request: &AssetRequest) -> Result<FetchedAsset>;
}

/// Builds an HTTP client with the session's user agent and a request timeout
pub fn build_http_client(
    user_agent: &str,
    timeout: Duration,
) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Formats cookies as a `Cookie` request header value
pub fn cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Asset fetcher backed by a plain reqwest client
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = build_http_client(user_agent, timeout)
            .map_err(|e| HarvestError::from_reqwest("asset client", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, request: &AssetRequest) -> Result<FetchedAsset> {
        let mut builder = self.client.get(&request.url);
        if let Some(referer) = &request.referer {
            builder = builder.header(REFERER, referer);
        }
        if !request.cookies.is_empty() {
            builder = builder.header(COOKIE, cookie_header(&request.cookies));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HarvestError::from_reqwest(&request.url, e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| HarvestError::from_reqwest(&request.url, e))?;

        tracing::debug!("Fetched {} ({} bytes, HTTP {})", request.url, body.len(), status);
        Ok(FetchedAsset {
            status,
            body: body.to_vec(),
        })
    }
}
