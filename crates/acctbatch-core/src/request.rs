//! Account request records.
//!
//! One [`AccountRequest`] per requested account, keyed by `AccountName`.
//! Status values are persisted as their upper-case string form so that
//! workflow states reported by the provisioning catalog can be mirrored
//! verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder account id stored until the workflow assigns a real one.
pub const ACCOUNT_ID_UNKNOWN: &str = "UNKNOWN";

/// Account id stored when the catalog rejected the request outright.
pub const ACCOUNT_ID_NOT_APPLICABLE: &str = "NOT_APPLICABLE";

/// Lifecycle status of an account request.
///
/// Ordering of stages (see [`RequestStatus::can_advance_to`]):
///
/// ```text
/// VALID / INVALID / ALREADY_EXISTS  ->  DISPATCHING  ->  IN_PROGRESS, <workflow>  ->  SUCCEEDED / FAILED / NOT_PROVISIONED
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestStatus {
    /// Passed batch validation, waiting to be dispatched.
    Valid,
    /// Failed one or more validation checks.
    Invalid,
    /// Matches an account that already exists in the directory.
    AlreadyExists,
    /// Claimed by a dispatcher; a provisioning request is being submitted.
    Dispatching,
    /// The catalog rejected the request or the workflow failed early.
    NotProvisioned,
    /// Workflow reported as still running.
    InProgress,
    /// Workflow completed successfully.
    Succeeded,
    /// Workflow completed with a failure.
    Failed,
    /// Any other workflow state, mirrored verbatim.
    Workflow(String),
}

impl RequestStatus {
    /// Upper-case persisted form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::Dispatching => "DISPATCHING",
            Self::NotProvisioned => "NOT_PROVISIONED",
            Self::InProgress => "IN_PROGRESS",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Workflow(state) => state.as_str(),
        }
    }

    fn stage(&self) -> u8 {
        match self {
            Self::Valid | Self::Invalid | Self::AlreadyExists => 0,
            Self::Dispatching => 1,
            Self::InProgress | Self::Workflow(_) => 2,
            Self::Succeeded | Self::Failed | Self::NotProvisioned => 3,
        }
    }

    /// Whether a provisioning workflow is claimed or running for the request.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(self.stage(), 1 | 2)
    }

    /// Whether moving from `self` to `next` keeps the status moving forward.
    ///
    /// Terminal states accept no further transitions. Repeating an
    /// in-flight stage (e.g. two `IN_PROGRESS` notifications) is allowed.
    #[must_use]
    pub fn can_advance_to(&self, next: &RequestStatus) -> bool {
        match self.stage() {
            3 => false,
            0 => next.stage() > 0,
            stage => next.stage() >= stage,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RequestStatus {
    fn from(value: &str) -> Self {
        match value {
            "VALID" => Self::Valid,
            "INVALID" => Self::Invalid,
            "ALREADY_EXISTS" => Self::AlreadyExists,
            "DISPATCHING" => Self::Dispatching,
            "NOT_PROVISIONED" => Self::NotProvisioned,
            "IN_PROGRESS" => Self::InProgress,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            other => Self::Workflow(other.to_string()),
        }
    }
}

impl From<String> for RequestStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<RequestStatus> for String {
    fn from(value: RequestStatus) -> Self {
        value.as_str().to_string()
    }
}

/// Account id as recorded for a request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountId {
    /// No workflow has assigned an id yet.
    #[default]
    Unknown,
    /// The request never reached a workflow.
    NotApplicable,
    /// Id assigned by the provisioning workflow.
    Assigned(String),
}

impl AccountId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown => ACCOUNT_ID_UNKNOWN,
            Self::NotApplicable => ACCOUNT_ID_NOT_APPLICABLE,
            Self::Assigned(id) => id.as_str(),
        }
    }

    #[must_use]
    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned(_))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        match value.trim() {
            "" | ACCOUNT_ID_UNKNOWN => Self::Unknown,
            ACCOUNT_ID_NOT_APPLICABLE => Self::NotApplicable,
            id => Self::Assigned(id.to_string()),
        }
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.as_str().to_string()
    }
}

/// The six user-supplied fields of a request, named as in the batch file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFields {
    #[serde(rename = "AccountName")]
    pub account_name: String,
    #[serde(rename = "AccountEmail")]
    pub account_email: String,
    #[serde(rename = "SSOUserEmail")]
    pub sso_user_email: String,
    #[serde(rename = "SSOUserFirstName")]
    pub sso_user_first_name: String,
    #[serde(rename = "SSOUserLastName")]
    pub sso_user_last_name: String,
    #[serde(rename = "OrgUnit")]
    pub org_unit: String,
}

impl RequestFields {
    /// Field names paired with their values, in batch-file column order.
    #[must_use]
    pub fn named_values(&self) -> [(&'static str, &str); 6] {
        [
            ("AccountName", &self.account_name),
            ("AccountEmail", &self.account_email),
            ("SSOUserEmail", &self.sso_user_email),
            ("SSOUserFirstName", &self.sso_user_first_name),
            ("SSOUserLastName", &self.sso_user_last_name),
            ("OrgUnit", &self.org_unit),
        ]
    }
}

/// A persisted account request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRequest {
    #[serde(flatten)]
    pub fields: RequestFields,
    #[serde(rename = "Status")]
    pub status: RequestStatus,
    #[serde(rename = "AccountId")]
    pub account_id: AccountId,
    #[serde(rename = "Message")]
    pub message: String,
}

impl AccountRequest {
    /// Fresh request as written by batch validation.
    #[must_use]
    pub fn new(fields: RequestFields, status: RequestStatus, message: impl Into<String>) -> Self {
        Self {
            fields,
            status,
            account_id: AccountId::Unknown,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn account_name(&self) -> &str {
        &self.fields.account_name
    }

    /// Apply a status update in place.
    ///
    /// An already assigned account id is never replaced; returns `false`
    /// when the update carried a different id that was dropped.
    pub fn apply(&mut self, update: StatusUpdate) -> bool {
        self.status = update.status;
        self.message = update.message;

        match update.account_id {
            Some(id) if self.account_id.is_assigned() => id == self.account_id,
            Some(id) => {
                self.account_id = id;
                true
            }
            None => true,
        }
    }
}

/// Change to the status portion of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: RequestStatus,
    /// `None` leaves the stored id untouched.
    pub account_id: Option<AccountId>,
    pub message: String,
}

impl StatusUpdate {
    #[must_use]
    pub fn new(status: RequestStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            account_id: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    /// Early failure before or right after submission.
    #[must_use]
    pub fn not_provisioned(message: impl Into<String>) -> Self {
        Self::new(RequestStatus::NotProvisioned, message).with_account_id(AccountId::NotApplicable)
    }
}
