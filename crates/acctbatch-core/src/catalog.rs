//! Provisioning catalog capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CatalogResult;

/// Workflow status reported while a provisioned product is being created.
pub const WORKFLOW_UNDER_CHANGE: &str = "UNDER_CHANGE";

/// A catalog product visible to the administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
}

/// A portfolio that shares a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub id: String,
    pub provider_name: Option<String>,
}

/// Key/value parameter passed to the provisioning workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningParameter {
    pub key: String,
    pub value: String,
}

impl ProvisioningParameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One provisioning submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub product_id: String,
    pub artifact_id: String,
    pub provisioned_product_name: String,
    pub parameters: Vec<ProvisioningParameter>,
    /// Idempotency token; a fresh value per submission.
    pub token: String,
}

/// Current state of a provisioning workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub status: String,
    pub message: Option<String>,
}

impl WorkflowStatus {
    /// Whether the workflow is still in its transient running state.
    #[must_use]
    pub fn is_under_change(&self) -> bool {
        self.status == WORKFLOW_UNDER_CHANGE
    }
}

/// Operations against the external provisioning catalog.
#[async_trait]
pub trait ProvisioningCatalog: Send + Sync {
    /// Products owned by `owner`, as seen by an administrator.
    async fn search_products(&self, owner: &str) -> CatalogResult<Vec<ProductSummary>>;

    /// Portfolios that share `product_id`.
    async fn list_portfolios(&self, product_id: &str) -> CatalogResult<Vec<PortfolioSummary>>;

    /// Provisioning artifact ids of `product_id`, oldest first.
    async fn list_artifacts(&self, product_id: &str) -> CatalogResult<Vec<String>>;

    /// Principal ARNs associated with `portfolio_id`.
    async fn list_principals(&self, portfolio_id: &str) -> CatalogResult<Vec<String>>;

    /// Grant `principal_arn` access to `portfolio_id`.
    async fn associate_principal(&self, portfolio_id: &str, principal_arn: &str)
        -> CatalogResult<()>;

    /// Submit a provisioning request; returns the provisioned product id
    /// that identifies the workflow.
    async fn provision(&self, request: &ProvisionRequest) -> CatalogResult<String>;

    /// Status of the provisioned product created by a workflow.
    async fn workflow_status(&self, workflow_id: &str) -> CatalogResult<WorkflowStatus>;
}
