//! Custom-resource requests and their acknowledgment.
//!
//! The initial-load trigger arrives as a custom-resource request from the
//! orchestration platform, which waits until a response is delivered to the
//! request's `ResponseURL`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AckResult;

/// Physical resource id reported for every acknowledgment.
pub const PHYSICAL_RESOURCE_ID: &str = "CustomResourcePhysicalID";

/// Kind of custom-resource request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Create,
    Update,
    Delete,
}

/// Custom-resource request as delivered by the orchestration platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceRequest {
    pub request_type: RequestKind,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: Option<serde_json::Value>,
}

/// Outcome reported back to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AckStatus {
    Success,
    Failed,
}

/// Response body delivered to `ResponseURL`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: AckStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub data: serde_json::Value,
}

impl CustomResourceResponse {
    #[must_use]
    pub fn for_request(
        request: &CustomResourceRequest,
        status: AckStatus,
        reason: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            status,
            reason: reason.into(),
            physical_resource_id: PHYSICAL_RESOURCE_ID.to_string(),
            stack_id: request.stack_id.clone(),
            request_id: request.request_id.clone(),
            logical_resource_id: request.logical_resource_id.clone(),
            data,
        }
    }
}

/// Delivers custom-resource responses.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn acknowledge(&self, request: &CustomResourceRequest, response: &CustomResourceResponse)
        -> AckResult<()>;
}
