//! DynamoDB record store.
//!
//! One item per request, keyed by `AccountName`, every attribute a string.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use tracing::debug;

use acctbatch_core::{
    AccountRequest, RecordStore, RequestFields, RequestStatus, StoreError, StoreResult,
};

const ACCOUNT_NAME: &str = "AccountName";
const ACCOUNT_EMAIL: &str = "AccountEmail";
const SSO_USER_EMAIL: &str = "SSOUserEmail";
const SSO_USER_FIRST_NAME: &str = "SSOUserFirstName";
const SSO_USER_LAST_NAME: &str = "SSOUserLastName";
const ORG_UNIT: &str = "OrgUnit";
const STATUS: &str = "Status";
const ACCOUNT_ID: &str = "AccountId";
const MESSAGE: &str = "Message";

type Item = HashMap<String, AttributeValue>;

/// Record store backed by a DynamoDB table.
#[derive(Debug, Clone)]
pub struct DynamoRecordStore {
    client: Client,
    table_name: String,
}

impl DynamoRecordStore {
    #[must_use]
    pub fn new(sdk_config: &aws_config::SdkConfig, table_name: impl Into<String>) -> Self {
        Self {
            client: Client::new(sdk_config),
            table_name: table_name.into(),
        }
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

/// Item attributes for `request`.
#[must_use]
pub fn to_item(request: &AccountRequest) -> Item {
    let fields = &request.fields;
    [
        (ACCOUNT_NAME, fields.account_name.as_str()),
        (ACCOUNT_EMAIL, fields.account_email.as_str()),
        (SSO_USER_EMAIL, fields.sso_user_email.as_str()),
        (SSO_USER_FIRST_NAME, fields.sso_user_first_name.as_str()),
        (SSO_USER_LAST_NAME, fields.sso_user_last_name.as_str()),
        (ORG_UNIT, fields.org_unit.as_str()),
        (STATUS, request.status.as_str()),
        (ACCOUNT_ID, request.account_id.as_str()),
        (MESSAGE, request.message.as_str()),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), AttributeValue::S(value.to_string())))
    .collect()
}

/// Map a stored item back to a request.
///
/// `AccountId` and `Message` default when absent; every other attribute
/// is required.
pub fn from_item(item: &Item) -> StoreResult<AccountRequest> {
    let text = |name: &str| item.get(name).and_then(|v| v.as_s().ok()).cloned();

    let account_name = text(ACCOUNT_NAME).ok_or_else(|| StoreError::Malformed {
        account_name: String::new(),
        attribute: ACCOUNT_NAME.to_string(),
    })?;
    let required = |name: &str| {
        text(name).ok_or_else(|| StoreError::Malformed {
            account_name: account_name.clone(),
            attribute: name.to_string(),
        })
    };

    let fields = RequestFields {
        account_name: account_name.clone(),
        account_email: required(ACCOUNT_EMAIL)?,
        sso_user_email: required(SSO_USER_EMAIL)?,
        sso_user_first_name: required(SSO_USER_FIRST_NAME)?,
        sso_user_last_name: required(SSO_USER_LAST_NAME)?,
        org_unit: required(ORG_UNIT)?,
    };
    let status = RequestStatus::from(required(STATUS)?);

    let mut request = AccountRequest::new(fields, status, text(MESSAGE).unwrap_or_default());
    if let Some(account_id) = text(ACCOUNT_ID) {
        request.account_id = account_id.into();
    }
    Ok(request)
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    async fn get(&self, account_name: &str) -> StoreResult<Option<AccountRequest>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ACCOUNT_NAME, AttributeValue::S(account_name.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StoreError::unavailable("GetItem", DisplayErrorContext(&e).to_string()))?;

        output.item().map(from_item).transpose()
    }

    async fn scan(&self) -> StoreResult<Vec<AccountRequest>> {
        let mut pages = self
            .client
            .scan()
            .table_name(&self.table_name)
            .consistent_read(true)
            .into_paginator()
            .send();
        let mut records = Vec::new();

        while let Some(page) = pages.next().await {
            let page =
                page.map_err(|e| StoreError::unavailable("Scan", DisplayErrorContext(&e).to_string()))?;
            for item in page.items() {
                records.push(from_item(item)?);
            }
        }

        debug!(table = %self.table_name, count = records.len(), "Scanned request table");
        Ok(records)
    }

    async fn put(&self, request: &AccountRequest) -> StoreResult<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(request)))
            .send()
            .await
            .map_err(|e| StoreError::unavailable("PutItem", DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn put_if_status(
        &self,
        request: &AccountRequest,
        expected: &RequestStatus,
    ) -> StoreResult<bool> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(request)))
            .condition_expression("#status = :expected")
            .expression_attribute_names("#status", STATUS)
            .expression_attribute_values(":expected", AttributeValue::S(expected.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                debug!(
                    account_name = %request.account_name(),
                    expected = %expected,
                    "Conditional write skipped, status changed"
                );
                Ok(false)
            }
            Err(e) => Err(StoreError::unavailable(
                "PutItem",
                DisplayErrorContext(&e).to_string(),
            )),
        }
    }
}
