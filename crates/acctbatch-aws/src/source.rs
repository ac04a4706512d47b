//! Batch file reader for S3 objects and HTTP(S) URLs.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use reqwest::Client;
use tracing::info;

use acctbatch_core::{BatchLocation, BatchSource, SourceError, SourceResult};

/// Reads batch files from S3 or over HTTP(S).
#[derive(Debug, Clone)]
pub struct BatchFetcher {
    s3: aws_sdk_s3::Client,
    http: Client,
}

impl BatchFetcher {
    #[must_use]
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::from_clients(
            aws_sdk_s3::Client::new(sdk_config),
            Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
        )
    }

    #[must_use]
    pub fn from_clients(s3: aws_sdk_s3::Client, http: Client) -> Self {
        Self { s3, http }
    }

    async fn fetch_object(
        &self,
        location: &BatchLocation,
        bucket: &str,
        key: &str,
    ) -> SourceResult<Vec<u8>> {
        let read_failed = |message: String| SourceError::ReadFailed {
            location: location.to_string(),
            message,
        };

        let output = self
            .s3
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| read_failed(DisplayErrorContext(&e).to_string()))?;
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| read_failed(e.to_string()))?;

        Ok(body.into_bytes().to_vec())
    }

    async fn fetch_url(&self, location: &BatchLocation, url: &str) -> SourceResult<Vec<u8>> {
        let read_failed = |e: reqwest::Error| SourceError::ReadFailed {
            location: location.to_string(),
            message: e.to_string(),
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(read_failed)?;
        let bytes = response.bytes().await.map_err(read_failed)?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl BatchSource for BatchFetcher {
    async fn fetch(&self, location: &BatchLocation) -> SourceResult<String> {
        let bytes = match location {
            BatchLocation::Object { bucket, key } => {
                self.fetch_object(location, bucket, key).await?
            }
            BatchLocation::Url(url) => self.fetch_url(location, url).await?,
        };
        info!(location = %location, bytes = bytes.len(), "Fetched batch file");

        String::from_utf8(bytes).map_err(|_| SourceError::InvalidEncoding {
            location: location.to_string(),
        })
    }
}
