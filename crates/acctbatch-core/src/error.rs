//! Error types for the external services the pipeline talks to.
//!
//! Each service seam has its own error enum. Callers decide whether an
//! error aborts the invocation, is recorded on a request, or is only logged.

use thiserror::Error;

/// Errors from the organization directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory could not be queried (network, throttling, permissions).
    #[error("directory query '{operation}' failed: {message}")]
    QueryFailed { operation: String, message: String },

    /// The organization has no root.
    #[error("organization root not found")]
    RootNotFound,

    /// The response was missing a field the pipeline relies on.
    #[error("directory response for '{operation}' is missing '{field}'")]
    MissingField { operation: String, field: String },
}

impl DirectoryError {
    pub fn query(operation: &str, message: impl Into<String>) -> Self {
        Self::QueryFailed {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for directory queries.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or rejected the call.
    #[error("record store '{operation}' failed: {message}")]
    Unavailable { operation: String, message: String },

    /// A stored item could not be mapped to an account request.
    #[error("malformed record '{account_name}': missing or non-string attribute '{attribute}'")]
    Malformed {
        account_name: String,
        attribute: String,
    },
}

impl StoreError {
    pub fn unavailable(operation: &str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the provisioning catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog refused the request (validation, limits, conflicting workflow).
    #[error("catalog rejected '{operation}': {message}")]
    Rejected { operation: String, message: String },

    /// The catalog could not be reached.
    #[error("catalog '{operation}' unavailable: {message}")]
    Unavailable { operation: String, message: String },

    /// A lookup by name found nothing.
    #[error("{kind} '{name}' not found in catalog")]
    NotFound { kind: String, name: String },

    /// The response was missing a field the pipeline relies on.
    #[error("catalog response for '{operation}' is missing '{field}'")]
    MissingField { operation: String, field: String },
}

impl CatalogError {
    pub fn rejected(operation: &str, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn unavailable(operation: &str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: &str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            name: name.into(),
        }
    }

    /// Whether retrying the same call later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors reading the batch file.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read batch from {location}: {message}")]
    ReadFailed { location: String, message: String },

    #[error("batch at {location} is not valid UTF-8")]
    InvalidEncoding { location: String },

    #[error("unsupported batch location '{0}'")]
    UnsupportedLocation(String),
}

/// Result type for batch reads.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors acknowledging a custom-resource request.
#[derive(Debug, Error)]
pub enum AckError {
    #[error("failed to send acknowledgment: {0}")]
    Send(String),

    #[error("acknowledgment endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("failed to encode acknowledgment: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for acknowledgments.
pub type AckResult<T> = Result<T, AckError>;
