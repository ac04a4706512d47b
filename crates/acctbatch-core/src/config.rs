//! Handler configuration parsed from environment variables.

use std::env::VarError;
use std::time::Duration;

use crate::source::BatchLocation;

/// Owner and provider name of the account factory product.
pub const DEFAULT_CATALOG_PROVIDER: &str = "AWS Control Tower";

/// Name of the account factory product.
pub const DEFAULT_CATALOG_PRODUCT: &str = "AWS Control Tower Account Factory";

/// Configuration shared by every trigger path.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Record store table name.
    pub table_name: String,

    /// Principal granted access to the account factory portfolio.
    pub principal_arn: String,

    /// Batch file read on initial load. Required only for that path.
    pub batch_location: Option<BatchLocation>,

    /// Owner / provider name used to find the product and its portfolio.
    pub catalog_provider: String,

    /// Product name of the account factory.
    pub catalog_product: String,

    /// Wait after a new principal association before provisioning.
    pub association_delay: Duration,

    /// Age after which an unfinished DISPATCHING claim is resubmitted.
    pub claim_timeout: Duration,

    /// Number of status checks after a dispatch.
    pub poll_attempts: u32,

    /// Wait between status checks.
    pub poll_interval: Duration,

    /// Region override; `None` uses the SDK default chain.
    pub region: Option<String>,
}

impl HandlerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// Tests supply variables this way instead of mutating the process
    /// environment.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let required = |key: &str| {
            reader(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };
        let optional = |key: &str| reader(key).ok().filter(|v| !v.trim().is_empty());

        let table_name = required("TABLE_NAME")?;
        let principal_arn = required("PRINCIPAL_ARN")?;

        let batch_location = match (
            optional("BATCH_BUCKET_NAME"),
            optional("BATCH_KEY_NAME"),
            optional("BATCH_ACCT_INPUT"),
        ) {
            (Some(bucket), Some(key), url) => {
                if url.is_some() {
                    tracing::warn!("BATCH_ACCT_INPUT ignored, BATCH_BUCKET_NAME and BATCH_KEY_NAME take precedence");
                }
                Some(BatchLocation::object(bucket, key))
            }
            (Some(_), None, _) => return Err(ConfigError::MissingVar("BATCH_KEY_NAME".into())),
            (None, Some(_), _) => return Err(ConfigError::MissingVar("BATCH_BUCKET_NAME".into())),
            (None, None, Some(url)) => Some(url.parse::<BatchLocation>().map_err(|e| {
                ConfigError::InvalidValue("BATCH_ACCT_INPUT".into(), e.to_string())
            })?),
            (None, None, None) => None,
        };

        let parse_u64 = |key: &str, default: u64| -> Result<u64, ConfigError> {
            match optional(key) {
                Some(v) => v
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
                None => Ok(default),
            }
        };

        let association_delay = Duration::from_secs(parse_u64("ASSOCIATION_DELAY_SECS", 10)?);
        let poll_interval = Duration::from_secs(parse_u64("POLL_INTERVAL_SECS", 30)?);
        let claim_timeout = Duration::from_secs(parse_u64("DISPATCH_CLAIM_TIMEOUT_SECS", 900)?);
        let poll_attempts = u32::try_from(parse_u64("POLL_ATTEMPTS", 3)?)
            .map_err(|e| ConfigError::InvalidValue("POLL_ATTEMPTS".into(), e.to_string()))?;

        Ok(Self {
            table_name,
            principal_arn,
            batch_location,
            catalog_provider: optional("CATALOG_PROVIDER_NAME")
                .unwrap_or_else(|| DEFAULT_CATALOG_PROVIDER.to_string()),
            catalog_product: optional("CATALOG_PRODUCT_NAME")
                .unwrap_or_else(|| DEFAULT_CATALOG_PRODUCT.to_string()),
            association_delay,
            claim_timeout,
            poll_attempts,
            poll_interval,
            region: optional("AWS_REGION"),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
