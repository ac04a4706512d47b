//! acctbatch Core Library
//!
//! Shared types and service capabilities for batch account provisioning.
//!
//! # Modules
//!
//! - [`request`] - Account request records, statuses and status updates
//! - [`directory`] - Organization directory capability
//! - [`store`] - Record store capability (plus an in-memory store behind `testing`)
//! - [`catalog`] - Provisioning catalog capability
//! - [`source`] - Batch file locations and reader capability
//! - [`ack`] - Custom-resource request acknowledgment
//! - [`config`] - Handler configuration
//! - [`error`] - Per-service error types

pub mod ack;
pub mod catalog;
pub mod config;
pub mod directory;
pub mod error;
pub mod request;
pub mod source;
pub mod store;

pub use ack::{
    AckStatus, Acknowledger, CustomResourceRequest, CustomResourceResponse, RequestKind,
    PHYSICAL_RESOURCE_ID,
};
pub use catalog::{
    PortfolioSummary, ProductSummary, ProvisionRequest, ProvisioningCatalog,
    ProvisioningParameter, WorkflowStatus, WORKFLOW_UNDER_CHANGE,
};
pub use config::{ConfigError, HandlerConfig};
pub use directory::{DirectoryAccount, OrganizationDirectory, OrganizationalUnit};
pub use error::{
    AckError, AckResult, CatalogError, CatalogResult, DirectoryError, DirectoryResult,
    SourceError, SourceResult, StoreError, StoreResult,
};
pub use request::{AccountId, AccountRequest, RequestFields, RequestStatus, StatusUpdate};
pub use source::{BatchLocation, BatchSource};
pub use store::RecordStore;

#[cfg(any(test, feature = "testing"))]
pub use store::MemoryRecordStore;
