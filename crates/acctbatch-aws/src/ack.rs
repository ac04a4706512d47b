//! CloudFormation custom-resource responder.
//!
//! The response is PUT to the request's pre-signed `ResponseURL`. The URL is
//! signed without a content type, so the header is sent empty.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, instrument};

use acctbatch_core::{
    AckError, AckResult, Acknowledger, CustomResourceRequest, CustomResourceResponse,
};

/// Delivers custom-resource responses over HTTPS.
#[derive(Debug, Clone)]
pub struct CfnResponder {
    http: Client,
}

impl Default for CfnResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl CfnResponder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(
            Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        )
    }

    #[must_use]
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Acknowledger for CfnResponder {
    #[instrument(skip_all, fields(request_id = %request.request_id, status = ?response.status))]
    async fn acknowledge(
        &self,
        request: &CustomResourceRequest,
        response: &CustomResourceResponse,
    ) -> AckResult<()> {
        let body = serde_json::to_vec(response)?;
        debug!(bytes = body.len(), "Sending custom-resource response");

        let reply = self
            .http
            .put(&request.response_url)
            .header(CONTENT_TYPE, "")
            .body(body)
            .send()
            .await
            .map_err(|e| AckError::Send(e.to_string()))?;

        let status = reply.status();
        if !status.is_success() {
            return Err(AckError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acctbatch_core::{AckStatus, RequestKind};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(response_url: String) -> CustomResourceRequest {
        CustomResourceRequest {
            request_type: RequestKind::Create,
            response_url,
            stack_id: "arn:aws:cloudformation:us-east-1:123456789012:stack/batch/1".to_string(),
            request_id: "req-1".to_string(),
            logical_resource_id: "BatchTrigger".to_string(),
            physical_resource_id: None,
            resource_properties: None,
        }
    }

    #[tokio::test]
    async fn test_acknowledge_puts_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/response"))
            .and(body_partial_json(json!({
                "Status": "SUCCESS",
                "PhysicalResourceId": "CustomResourcePhysicalID",
                "RequestId": "req-1",
                "Data": { "writes": 2 }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let request = request(format!("{}/response", server.uri()));
        let response = CustomResourceResponse::for_request(
            &request,
            AckStatus::Success,
            "Loaded 2 of 3 batch rows",
            json!({ "writes": 2 }),
        );

        CfnResponder::new()
            .acknowledge(&request, &response)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_acknowledge_reports_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let request = request(format!("{}/response", server.uri()));
        let response =
            CustomResourceResponse::for_request(&request, AckStatus::Failed, "boom", json!({}));

        let err = CfnResponder::new()
            .acknowledge(&request, &response)
            .await
            .unwrap_err();
        assert!(matches!(err, AckError::Status { status: 403 }));
    }
}
