//! Branding image sources.
//!
//! A source is either a `data:` URL, decoded in place, or an HTTP(S) URL
//! fetched through an [`AssetFetcher`] with a bounded timeout.

use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use std::fmt;
use std::time::Duration;

/// Where a branding image comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// A `data:` URL carrying a base64 payload.
    Data(String),
    /// An `http://` or `https://` URL.
    Remote(String),
}

impl AssetSource {
    /// Classify a URL string from a pass request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPayload`] for any other scheme.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let lower = trimmed.get(..8).unwrap_or(trimmed).to_ascii_lowercase();
        if lower.starts_with("data:") {
            Ok(Self::Data(trimmed.to_string()))
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Self::Remote(trimmed.to_string()))
        } else {
            Err(Error::InvalidPayload(format!(
                "image URL must be a data URL or http(s) URL, got {:?}",
                trimmed.chars().take(32).collect::<String>()
            )))
        }
    }
}

// Data URLs can be megabytes long; keep logs and error messages short.
impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(url) => {
                let media_type = url
                    .strip_prefix("data:")
                    .or_else(|| url.get(5..))
                    .and_then(|rest| rest.split([';', ',']).next())
                    .filter(|m| !m.is_empty())
                    .unwrap_or("unknown");
                write!(f, "data URL ({}, {} bytes)", media_type, url.len())
            }
            Self::Remote(url) => f.write_str(url),
        }
    }
}

impl fmt::Debug for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetSource({})", self)
    }
}

/// Decode the base64 payload of a `data:` URL.
///
/// # Errors
///
/// Returns [`Error::AssetFetch`] if the URL has no `;base64,` payload or the
/// payload does not decode.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let fail = || Error::AssetFetch(AssetSource::Data(url.to_string()).to_string());

    let (header, payload) = url.split_once(',').ok_or_else(fail)?;
    if !header.to_ascii_lowercase().ends_with(";base64") {
        return Err(fail());
    }
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|_| fail())
}

/// Retrieves remote branding images.
///
/// Implementations must bound every request in time; a timeout is reported
/// the same way as any other fetch failure.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`AssetFetcher`] backed by a `reqwest` client with a request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::AssetFetch(format!("HTTP client setup: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::AssetFetch(format!("{} (timed out)", url))
            } else {
                Error::AssetFetch(format!("{} ({})", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::AssetFetch(format!("{} (HTTP {})", url, status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::AssetFetch(format!("{} ({})", url, e)))?;
        Ok(body.to_vec())
    }
}

/// Retrieve the bytes behind `source`.
///
/// Data URLs never touch the network.
pub async fn fetch(fetcher: &dyn AssetFetcher, source: &AssetSource) -> Result<Vec<u8>> {
    match source {
        AssetSource::Data(url) => decode_data_url(url),
        AssetSource::Remote(url) => fetcher.fetch_remote(url).await,
    }
}
