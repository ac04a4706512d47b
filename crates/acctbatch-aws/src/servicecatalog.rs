//! AWS Service Catalog provisioning catalog.

use async_trait::async_trait;
use aws_sdk_servicecatalog::error::{DisplayErrorContext, SdkError};
use aws_sdk_servicecatalog::types::{PrincipalType, ProductViewFilterBy};
use aws_sdk_servicecatalog::Client;
use tracing::{debug, info};

use acctbatch_core::{
    CatalogError, CatalogResult, PortfolioSummary, ProductSummary, ProvisionRequest,
    ProvisioningCatalog, ProvisioningParameter, WorkflowStatus,
};

/// Provisioning catalog backed by AWS Service Catalog.
#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    client: Client,
}

impl ServiceCatalog {
    #[must_use]
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

/// Service errors (validation, limits, conflicts) are rejections; transport
/// and throttling failures are reported as unavailable.
fn sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> CatalogError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::ServiceError(_) => CatalogError::rejected(operation, message),
        _ => CatalogError::unavailable(operation, message),
    }
}

fn missing(operation: &str, field: &str) -> CatalogError {
    CatalogError::MissingField {
        operation: operation.to_string(),
        field: field.to_string(),
    }
}

fn to_sdk_parameter(
    parameter: &ProvisioningParameter,
) -> aws_sdk_servicecatalog::types::ProvisioningParameter {
    aws_sdk_servicecatalog::types::ProvisioningParameter::builder()
        .key(&parameter.key)
        .value(&parameter.value)
        .build()
}

#[async_trait]
impl ProvisioningCatalog for ServiceCatalog {
    async fn search_products(&self, owner: &str) -> CatalogResult<Vec<ProductSummary>> {
        let mut pages = self
            .client
            .search_products_as_admin()
            .filters(ProductViewFilterBy::Owner, vec![owner.to_string()])
            .into_paginator()
            .send();
        let mut products = Vec::new();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| sdk_error("SearchProductsAsAdmin", e))?;
            for detail in page.product_view_details() {
                let Some(summary) = detail.product_view_summary() else {
                    continue;
                };
                let id = summary
                    .product_id()
                    .ok_or_else(|| missing("SearchProductsAsAdmin", "ProductId"))?;
                products.push(ProductSummary {
                    id: id.to_string(),
                    name: summary.name().unwrap_or_default().to_string(),
                });
            }
        }

        debug!(owner = %owner, count = products.len(), "Searched catalog products");
        Ok(products)
    }

    async fn list_portfolios(&self, product_id: &str) -> CatalogResult<Vec<PortfolioSummary>> {
        let mut pages = self
            .client
            .list_portfolios_for_product()
            .product_id(product_id)
            .into_paginator()
            .send();
        let mut portfolios = Vec::new();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| sdk_error("ListPortfoliosForProduct", e))?;
            for detail in page.portfolio_details() {
                let id = detail
                    .id()
                    .ok_or_else(|| missing("ListPortfoliosForProduct", "Id"))?;
                portfolios.push(PortfolioSummary {
                    id: id.to_string(),
                    provider_name: detail.provider_name().map(str::to_string),
                });
            }
        }

        Ok(portfolios)
    }

    async fn list_artifacts(&self, product_id: &str) -> CatalogResult<Vec<String>> {
        let output = self
            .client
            .list_provisioning_artifacts()
            .product_id(product_id)
            .send()
            .await
            .map_err(|e| sdk_error("ListProvisioningArtifacts", e))?;

        Ok(output
            .provisioning_artifact_details()
            .iter()
            .filter_map(|a| a.id().map(str::to_string))
            .collect())
    }

    async fn list_principals(&self, portfolio_id: &str) -> CatalogResult<Vec<String>> {
        let mut pages = self
            .client
            .list_principals_for_portfolio()
            .portfolio_id(portfolio_id)
            .into_paginator()
            .send();
        let mut principals = Vec::new();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| sdk_error("ListPrincipalsForPortfolio", e))?;
            principals.extend(
                page.principals()
                    .iter()
                    .filter_map(|p| p.principal_arn().map(str::to_string)),
            );
        }

        Ok(principals)
    }

    async fn associate_principal(
        &self,
        portfolio_id: &str,
        principal_arn: &str,
    ) -> CatalogResult<()> {
        self.client
            .associate_principal_with_portfolio()
            .portfolio_id(portfolio_id)
            .principal_arn(principal_arn)
            .principal_type(PrincipalType::Iam)
            .send()
            .await
            .map_err(|e| sdk_error("AssociatePrincipalWithPortfolio", e))?;

        info!(portfolio_id = %portfolio_id, principal_arn = %principal_arn, "Principal associated");
        Ok(())
    }

    async fn provision(&self, request: &ProvisionRequest) -> CatalogResult<String> {
        let parameters = request.parameters.iter().map(to_sdk_parameter).collect();

        let output = self
            .client
            .provision_product()
            .product_id(&request.product_id)
            .provisioning_artifact_id(&request.artifact_id)
            .provisioned_product_name(&request.provisioned_product_name)
            .set_provisioning_parameters(Some(parameters))
            .provision_token(&request.token)
            .send()
            .await
            .map_err(|e| sdk_error("ProvisionProduct", e))?;

        let record = output
            .record_detail()
            .ok_or_else(|| missing("ProvisionProduct", "RecordDetail"))?;
        debug!(record_id = ?record.record_id(), "Provisioning record created");

        record
            .provisioned_product_id()
            .map(str::to_string)
            .ok_or_else(|| missing("ProvisionProduct", "ProvisionedProductId"))
    }

    async fn workflow_status(&self, workflow_id: &str) -> CatalogResult<WorkflowStatus> {
        let output = self
            .client
            .describe_provisioned_product()
            .id(workflow_id)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeProvisionedProduct", e))?;

        let detail = output
            .provisioned_product_detail()
            .ok_or_else(|| missing("DescribeProvisionedProduct", "ProvisionedProductDetail"))?;
        let status = detail
            .status()
            .ok_or_else(|| missing("DescribeProvisionedProduct", "Status"))?;

        Ok(WorkflowStatus {
            status: status.as_str().to_string(),
            message: detail.status_message().map(str::to_string),
        })
    }
}
