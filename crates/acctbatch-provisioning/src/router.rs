//! Event router.
//!
//! Single entry point for handler invocations. Classifies the payload and
//! drives the matching pipeline step: load and validate a batch, dispatch
//! the next request, or record a lifecycle outcome and dispatch the next.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use acctbatch_core::{
    AckStatus, Acknowledger, BatchLocation, BatchSource, CustomResourceRequest,
    CustomResourceResponse, RequestKind, SourceError,
};

use crate::dispatcher::{DispatchError, DispatchOutcome, Dispatcher};
use crate::events::{EventError, InboundEvent, LifecycleEvent, StoreMutationEvent};
use crate::reconciler::{PollOutcome, ReconcileError, ReconcileOutcome, StatusReconciler};
use crate::validator::{BatchReport, BatchValidator, ValidatorError};

/// Router errors.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Event(#[from] EventError),

    #[error("Batch source error: {0}")]
    Source(#[from] SourceError),

    #[error("Batch validation error: {0}")]
    Validator(#[from] ValidatorError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("No batch location configured")]
    MissingBatchLocation,
}

/// Result type for routing.
pub type RouterResult<T> = Result<T, RouterError>;

/// A dispatch attempt and, when a workflow started, its early poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub outcome: DispatchOutcome,
    pub poll: Option<PollOutcome>,
}

/// What an invocation did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum RouteOutcome {
    InitialLoad {
        request_type: RequestKind,
        ack_status: AckStatus,
        /// Set when the acknowledgment could not be delivered.
        ack_error: Option<String>,
        report: Option<BatchReport>,
        dispatch: Option<DispatchReport>,
    },
    StoreMutation {
        event_names: Vec<String>,
        dispatch: Option<DispatchReport>,
    },
    Lifecycle {
        reconcile: Option<ReconcileOutcome>,
        dispatch: DispatchReport,
    },
    Ignored {
        reason: String,
    },
}

/// Routes handler invocations to the pipeline components.
pub struct EventRouter {
    validator: BatchValidator,
    dispatcher: Dispatcher,
    reconciler: StatusReconciler,
    source: Arc<dyn BatchSource>,
    acknowledger: Arc<dyn Acknowledger>,
    batch_location: Option<BatchLocation>,
}

impl EventRouter {
    pub fn new(
        validator: BatchValidator,
        dispatcher: Dispatcher,
        reconciler: StatusReconciler,
        source: Arc<dyn BatchSource>,
        acknowledger: Arc<dyn Acknowledger>,
        batch_location: Option<BatchLocation>,
    ) -> Self {
        Self {
            validator,
            dispatcher,
            reconciler,
            source,
            acknowledger,
            batch_location,
        }
    }

    /// Handle one raw invocation payload.
    #[instrument(skip(self, event))]
    pub async fn route(&self, event: serde_json::Value) -> RouterResult<RouteOutcome> {
        let event = InboundEvent::classify(event)?;
        info!(kind = event.kind(), "Routing event");

        match event {
            InboundEvent::InitialLoad(request) => self.handle_initial_load(request).await,
            InboundEvent::StoreMutation(event) => self.handle_store_mutation(event).await,
            InboundEvent::Lifecycle(event) => self.handle_lifecycle(event).await,
            InboundEvent::Unknown(value) => {
                let keys: Vec<String> = value
                    .as_object()
                    .map(|o| o.keys().cloned().collect())
                    .unwrap_or_default();
                warn!(keys = ?keys, "Unrecognized event, ignoring");
                Ok(RouteOutcome::Ignored {
                    reason: "unrecognized event".to_string(),
                })
            }
        }
    }

    async fn handle_initial_load(
        &self,
        request: CustomResourceRequest,
    ) -> RouterResult<RouteOutcome> {
        if request.request_type != RequestKind::Create {
            info!(request_type = ?request.request_type, "Nothing to do for this request type");
            let response = CustomResourceResponse::for_request(
                &request,
                AckStatus::Success,
                "No action required",
                json!({}),
            );
            let ack_error = self.send_ack(&request, &response).await;
            return Ok(RouteOutcome::InitialLoad {
                request_type: request.request_type,
                ack_status: AckStatus::Success,
                ack_error,
                report: None,
                dispatch: None,
            });
        }

        let loaded = self.load_batch().await;
        let response = match &loaded {
            Ok(report) if report.writes > 0 => CustomResourceResponse::for_request(
                &request,
                AckStatus::Success,
                format!("Loaded {} of {} batch rows", report.writes, report.rows.len()),
                json!({
                    "valid": report.valid,
                    "invalid": report.invalid,
                    "already_exists": report.already_exists,
                    "writes": report.writes,
                }),
            ),
            Ok(_) => CustomResourceResponse::for_request(
                &request,
                AckStatus::Failed,
                "No records were written from the batch",
                json!({ "error": "Failed to load the data" }),
            ),
            Err(e) => {
                error!(error = %e, "Failed to load the batch");
                CustomResourceResponse::for_request(
                    &request,
                    AckStatus::Failed,
                    e.to_string(),
                    json!({ "error": "Failed to load the data" }),
                )
            }
        };
        let ack_status = response.status;
        let ack_error = self.send_ack(&request, &response).await;

        let report = match loaded {
            Ok(report) => report,
            Err(_) => {
                return Ok(RouteOutcome::InitialLoad {
                    request_type: request.request_type,
                    ack_status,
                    ack_error,
                    report: None,
                    dispatch: None,
                })
            }
        };

        let dispatch = self.dispatch_and_poll().await?;
        Ok(RouteOutcome::InitialLoad {
            request_type: request.request_type,
            ack_status,
            ack_error,
            report: Some(report),
            dispatch: Some(dispatch),
        })
    }

    async fn handle_store_mutation(&self, event: StoreMutationEvent) -> RouterResult<RouteOutcome> {
        let event_names = event.event_names();
        if event.is_insert_only() {
            info!(changes = event_names.len(), "Insert-only change batch, nothing to dispatch");
            return Ok(RouteOutcome::StoreMutation {
                event_names,
                dispatch: None,
            });
        }

        let dispatch = self.dispatch_and_poll().await?;
        Ok(RouteOutcome::StoreMutation {
            event_names,
            dispatch: Some(dispatch),
        })
    }

    async fn handle_lifecycle(&self, event: LifecycleEvent) -> RouterResult<RouteOutcome> {
        let reconcile = match event.account_status() {
            Some(status) => Some(self.reconciler.apply_lifecycle(status).await?),
            None => {
                info!(
                    event_name = ?event.detail.event_name,
                    "Lifecycle event carries no account creation status"
                );
                None
            }
        };

        let dispatch = self.dispatch_and_poll().await?;
        Ok(RouteOutcome::Lifecycle {
            reconcile,
            dispatch,
        })
    }

    /// Fetch and validate the configured batch, writing VALID/INVALID records.
    pub async fn load_batch(&self) -> RouterResult<BatchReport> {
        let location = self
            .batch_location
            .as_ref()
            .ok_or(RouterError::MissingBatchLocation)?;
        info!(location = %location, "Loading batch");
        let content = self.source.fetch(location).await?;
        Ok(self.validator.validate_batch(&content).await?)
    }

    /// Dispatch the next request and poll it when a workflow started.
    pub async fn dispatch_and_poll(&self) -> RouterResult<DispatchReport> {
        let outcome = self.dispatcher.provision_next().await?;
        let poll = match &outcome {
            DispatchOutcome::Dispatched {
                account_name,
                workflow_id,
            } => Some(
                self.reconciler
                    .poll_after_dispatch(account_name, workflow_id)
                    .await?,
            ),
            _ => None,
        };
        Ok(DispatchReport { outcome, poll })
    }

    async fn send_ack(
        &self,
        request: &CustomResourceRequest,
        response: &CustomResourceResponse,
    ) -> Option<String> {
        match self.acknowledger.acknowledge(request, response).await {
            Ok(()) => {
                info!(status = ?response.status, "Acknowledged initial load request");
                None
            }
            Err(e) => {
                error!(error = %e, "Failed to acknowledge initial load request");
                Some(e.to_string())
            }
        }
    }
}
