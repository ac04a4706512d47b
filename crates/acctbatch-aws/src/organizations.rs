//! AWS Organizations directory.

use async_trait::async_trait;
use aws_sdk_organizations::error::DisplayErrorContext;
use aws_sdk_organizations::Client;

use acctbatch_core::{
    DirectoryAccount, DirectoryError, DirectoryResult, OrganizationDirectory, OrganizationalUnit,
};

/// Organization directory backed by AWS Organizations.
#[derive(Debug, Clone)]
pub struct OrganizationsDirectory {
    client: Client,
}

impl OrganizationsDirectory {
    #[must_use]
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

fn missing(operation: &str, field: &str) -> DirectoryError {
    DirectoryError::MissingField {
        operation: operation.to_string(),
        field: field.to_string(),
    }
}

#[async_trait]
impl OrganizationDirectory for OrganizationsDirectory {
    async fn list_roots(&self) -> DirectoryResult<Vec<String>> {
        let mut pages = self.client.list_roots().into_paginator().send();
        let mut ids = Vec::new();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                DirectoryError::query("ListRoots", DisplayErrorContext(&e).to_string())
            })?;
            for root in page.roots() {
                let id = root.id().ok_or_else(|| missing("ListRoots", "Id"))?;
                ids.push(id.to_string());
            }
        }

        Ok(ids)
    }

    async fn list_child_units(&self, parent_id: &str) -> DirectoryResult<Vec<OrganizationalUnit>> {
        let mut pages = self
            .client
            .list_organizational_units_for_parent()
            .parent_id(parent_id)
            .into_paginator()
            .send();
        let mut units = Vec::new();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                DirectoryError::query(
                    "ListOrganizationalUnitsForParent",
                    DisplayErrorContext(&e).to_string(),
                )
            })?;
            for ou in page.organizational_units() {
                let id = ou
                    .id()
                    .ok_or_else(|| missing("ListOrganizationalUnitsForParent", "Id"))?;
                units.push(OrganizationalUnit {
                    id: id.to_string(),
                    name: ou.name().unwrap_or_default().to_string(),
                });
            }
        }

        tracing::debug!(parent_id = %parent_id, count = units.len(), "Listed organizational units");
        Ok(units)
    }

    async fn list_accounts(&self) -> DirectoryResult<Vec<DirectoryAccount>> {
        let mut pages = self.client.list_accounts().into_paginator().send();
        let mut accounts = Vec::new();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                DirectoryError::query("ListAccounts", DisplayErrorContext(&e).to_string())
            })?;
            for account in page.accounts() {
                let id = account.id().ok_or_else(|| missing("ListAccounts", "Id"))?;
                accounts.push(DirectoryAccount {
                    id: id.to_string(),
                    name: account.name().unwrap_or_default().to_string(),
                    email: account.email().unwrap_or_default().to_string(),
                });
            }
        }

        Ok(accounts)
    }
}
