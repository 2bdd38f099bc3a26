// HTTP client for gesetze-im-internet.de

use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::archive::{read_law_zip, LawArchive};
use super::parsing::read_source_timestamp;
use super::toc::parse_toc;
use crate::config::GiiConfig;
use crate::errors::DownloadError;
use crate::retry::{retry_download, ExponentialBackoff, RetryStrategy};

/// Source of upstream law data
#[async_trait]
pub trait LawSource: Send + Sync {
    /// GII slug → archive URL for every published law
    async fn fetch_toc(&self) -> Result<BTreeMap<String, String>, DownloadError>;

    /// Download and unpack one law archive
    async fn download_law(&self, url: &str) -> Result<LawArchive, DownloadError>;

    /// Whether the archive at `url` is newer than `previous_timestamp`
    ///
    /// Timestamps are `builddate` values (`YYYYMMDDhhmmss`), so string order
    /// is chronological order.
    async fn has_update(&self, url: &str, previous_timestamp: &str) -> Result<bool, DownloadError> {
        let archive = self.download_law(url).await?;
        let timestamp = read_source_timestamp(&archive.xml)?;
        Ok(timestamp.as_str() > previous_timestamp)
    }
}

/// reqwest-backed [`LawSource`]
#[derive(Clone)]
pub struct GiiClient {
    client: Client,
    toc_url: String,
    retry: Arc<dyn RetryStrategy>,
}

impl GiiClient {
    pub fn new(config: &GiiConfig) -> Result<Self, DownloadError> {
        Self::with_strategy(config, Arc::new(ExponentialBackoff::new(config.max_retries)))
    }

    pub fn with_strategy(config: &GiiConfig, retry: Arc<dyn RetryStrategy>) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("gadi/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DownloadError::ClientSetup(e.to_string()))?;

        Ok(Self {
            client,
            toc_url: config.toc_url.clone(),
            retry,
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        retry_download(self.retry.as_ref(), url, || async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| DownloadError::RequestFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(DownloadError::UnexpectedStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let bytes = response.bytes().await.map_err(|e| DownloadError::RequestFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            Ok(bytes.to_vec())
        })
        .await
    }
}

#[async_trait]
impl LawSource for GiiClient {
    #[instrument(skip(self), fields(toc_url = %self.toc_url))]
    async fn fetch_toc(&self) -> Result<BTreeMap<String, String>, DownloadError> {
        let bytes = self.get_bytes(&self.toc_url).await?;
        let input = String::from_utf8(bytes).map_err(|e| DownloadError::InvalidToc(e.to_string()))?;
        let toc = parse_toc(&input)?;
        debug!(count = toc.len(), "Fetched table of contents");
        Ok(toc)
    }

    #[instrument(skip(self))]
    async fn download_law(&self, url: &str) -> Result<LawArchive, DownloadError> {
        let bytes = self.get_bytes(url).await?;
        read_law_zip(&bytes)
    }
}
