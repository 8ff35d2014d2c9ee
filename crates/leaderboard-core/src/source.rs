//! Leaderboard data sources
//!
//! A [`DataSource`] yields one [`RawDataset`] snapshot per call. Sources never
//! retry or cache; the refresh scheduler decides when to call again.

use crate::types::RawDataset;
use crate::{Error, Result};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Something that can produce a leaderboard snapshot
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch a fresh snapshot.
    ///
    /// Fails with [`Error::Fetch`] when the source cannot be reached and with
    /// [`Error::Parse`] when the payload is not a leaderboard.
    async fn fetch(&self) -> Result<RawDataset>;

    /// Human-readable location of the source, for logs
    fn describe(&self) -> String;
}

/// Decode a leaderboard payload
pub fn parse_dataset(body: &[u8]) -> Result<RawDataset> {
    serde_json::from_slice::<RawDataset>(body)
        .map_err(|e| Error::parse(format!("invalid leaderboard payload: {}", e)))
}

/// Leaderboard REST endpoint
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpDataSource {
    /// Create a new HTTP source for the given endpoint
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::config(format!("Invalid endpoint URL '{}': {}", endpoint, e)))?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Unsupported endpoint scheme '{}'",
                endpoint.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// Get the configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch(&self) -> Result<RawDataset> {
        let started = Instant::now();
        debug!("Fetching leaderboard from {}", self.endpoint);

        let response = self
            .client
            .get(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::fetch(format!("request to {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(format!(
                "{} answered {}",
                self.endpoint, status
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("application/json") {
            warn!(
                "Leaderboard endpoint returned content type '{}', decoding as JSON anyway",
                content_type
            );
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::fetch(format!("failed to read response body: {}", e)))?;

        let dataset = parse_dataset(&body)?;
        debug!(
            "Fetched {} nodes from {} in {:?}",
            dataset.len(),
            self.endpoint,
            started.elapsed()
        );
        Ok(dataset)
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}

/// Saved leaderboard snapshot on disk
#[derive(Debug, Clone)]
pub struct FileDataSource {
    path: PathBuf,
}

impl FileDataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for FileDataSource {
    async fn fetch(&self) -> Result<RawDataset> {
        debug!("Reading leaderboard snapshot from {}", self.path.display());

        let body = tokio::fs::read(&self.path).await.map_err(|e| {
            Error::fetch(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        parse_dataset(&body)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
