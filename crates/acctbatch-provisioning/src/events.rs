//! Inbound event payloads.
//!
//! The handler is invoked with three kinds of payload: the custom-resource
//! request that starts a batch, record store change notifications, and
//! account lifecycle events from the landing-zone service. Anything else is
//! classified as unknown.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use acctbatch_core::{AccountId, CustomResourceRequest, RequestStatus, StatusUpdate};

/// Event source of account lifecycle notifications.
pub const LIFECYCLE_EVENT_SOURCE: &str = "aws.controltower";

/// Change notification kind for a newly inserted record.
pub const INSERT_EVENT: &str = "INSERT";

/// Event errors.
#[derive(Debug, Error)]
pub enum EventError {
    /// The payload matched a known kind but did not decode.
    #[error("Invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for event decoding.
pub type EventResult<T> = Result<T, EventError>;

/// Record store change notification batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMutationEvent {
    #[serde(rename = "Records")]
    pub records: Vec<StoreChange>,
}

/// One changed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreChange {
    #[serde(rename = "eventName")]
    pub event_name: String,
}

impl StoreChange {
    #[must_use]
    pub fn is_insert(&self) -> bool {
        self.event_name.eq_ignore_ascii_case(INSERT_EVENT)
    }
}

impl StoreMutationEvent {
    /// Whether every change is an insert (initial batch load writes).
    #[must_use]
    pub fn is_insert_only(&self) -> bool {
        self.records.iter().all(StoreChange::is_insert)
    }

    /// Change kinds in delivery order.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.event_name.clone()).collect()
    }
}

/// Lifecycle notification for a managed account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub source: String,
    #[serde(rename = "detail-type", default)]
    pub detail_type: Option<String>,
    pub detail: LifecycleDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleDetail {
    #[serde(default)]
    pub event_name: Option<String>,
    pub service_event_details: ServiceEventDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEventDetails {
    /// Present for account creation events only.
    #[serde(default)]
    pub create_managed_account_status: Option<ManagedAccountStatus>,
}

/// Outcome of an account creation workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedAccountStatus {
    pub state: String,
    #[serde(default)]
    pub message: String,
    pub account: ManagedAccount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedAccount {
    pub account_id: String,
    pub account_name: String,
}

impl ManagedAccountStatus {
    /// Status update to apply to the matching record.
    #[must_use]
    pub fn to_update(&self) -> StatusUpdate {
        StatusUpdate::new(RequestStatus::from(self.state.as_str()), self.message.clone())
            .with_account_id(AccountId::from(self.account.account_id.as_str()))
    }
}

impl LifecycleEvent {
    /// Account creation status, when the event carries one.
    #[must_use]
    pub fn account_status(&self) -> Option<&ManagedAccountStatus> {
        self.detail
            .service_event_details
            .create_managed_account_status
            .as_ref()
    }
}

/// A classified handler invocation payload.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    InitialLoad(CustomResourceRequest),
    StoreMutation(StoreMutationEvent),
    Lifecycle(LifecycleEvent),
    Unknown(serde_json::Value),
}

impl InboundEvent {
    /// Classify and decode a raw payload.
    ///
    /// Store notifications are recognized by `Records`, lifecycle events by
    /// their `source`, and initial-load requests by `RequestType`.
    pub fn classify(value: serde_json::Value) -> EventResult<Self> {
        if value.get("Records").is_some() {
            return decode("store mutation", value).map(Self::StoreMutation);
        }
        if value.get("source").and_then(serde_json::Value::as_str) == Some(LIFECYCLE_EVENT_SOURCE)
        {
            return decode("lifecycle", value).map(Self::Lifecycle);
        }
        if value.get("RequestType").is_some() {
            return decode("initial load", value).map(Self::InitialLoad);
        }
        Ok(Self::Unknown(value))
    }

    /// Short kind name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitialLoad(_) => "initial_load",
            Self::StoreMutation(_) => "store_mutation",
            Self::Lifecycle(_) => "lifecycle",
            Self::Unknown(_) => "unknown",
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    kind: &'static str,
    value: serde_json::Value,
) -> EventResult<T> {
    serde_json::from_value(value).map_err(|source| EventError::InvalidPayload { kind, source })
}
