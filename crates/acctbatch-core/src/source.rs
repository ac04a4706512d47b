//! Batch file locations and the capability that reads them.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::{SourceError, SourceResult};

/// Where a batch file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchLocation {
    /// Object in blob storage.
    Object { bucket: String, key: String },
    /// Plain HTTP(S) URL.
    Url(String),
}

impl BatchLocation {
    pub fn object(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Object {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for BatchLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object { bucket, key } => write!(f, "s3://{bucket}/{key}"),
            Self::Url(url) => f.write_str(url),
        }
    }
}

impl FromStr for BatchLocation {
    type Err = SourceError;

    /// Accepts `s3://bucket/key`, `http://…` and `https://…`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("s3://") {
            return match rest.split_once('/') {
                Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                    Ok(Self::object(bucket, key))
                }
                _ => Err(SourceError::UnsupportedLocation(s.to_string())),
            };
        }
        if s.starts_with("https://") || s.starts_with("http://") {
            return Ok(Self::Url(s.to_string()));
        }
        Err(SourceError::UnsupportedLocation(s.to_string()))
    }
}

/// Reads batch file contents.
#[async_trait]
pub trait BatchSource: Send + Sync {
    /// Return the batch file as UTF-8 text.
    async fn fetch(&self, location: &BatchLocation) -> SourceResult<String>;
}
