//! Status reconciliation.
//!
//! Records the outcome of provisioning workflows, either from lifecycle
//! notifications or by polling the catalog right after a dispatch to catch
//! workflows that fail within the first minutes.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use acctbatch_core::{
    AccountRequest, CatalogError, HandlerConfig, ProvisioningCatalog, RecordStore, RequestStatus,
    StatusUpdate, StoreError,
};

use crate::events::ManagedAccountStatus;

/// Workflow status of a product that finished provisioning.
pub const WORKFLOW_AVAILABLE: &str = "AVAILABLE";

/// Reconciler errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Result type for reconciliation.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Result of applying a lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The record was updated.
    Updated { record: AccountRequest },
    /// No record with that account name; nothing written.
    UnknownAccount { account_name: String },
    /// The notification would move the record backwards; nothing written.
    Stale {
        account_name: String,
        current: RequestStatus,
        reported: RequestStatus,
    },
}

/// Result of polling a freshly dispatched workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    /// Still under change after every check; the lifecycle path takes over.
    StillRunning { checks: u32 },
    /// Workflow already finished successfully; the lifecycle path records it.
    Completed,
    /// Workflow left its running state without completing.
    EarlyFailure {
        status: String,
        message: String,
        /// Whether the NOT_PROVISIONED write landed.
        recorded: bool,
    },
}

/// Poll settings.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub attempts: u32,
    pub interval: Duration,
}

impl From<&HandlerConfig> for PollConfig {
    fn from(config: &HandlerConfig) -> Self {
        Self {
            attempts: config.poll_attempts,
            interval: config.poll_interval,
        }
    }
}

/// Applies workflow outcomes to stored records.
pub struct StatusReconciler {
    store: Arc<dyn RecordStore>,
    catalog: Arc<dyn ProvisioningCatalog>,
    poll: PollConfig,
}

impl StatusReconciler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        catalog: Arc<dyn ProvisioningCatalog>,
        poll: PollConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            poll,
        }
    }

    /// Apply a lifecycle notification to the record it names.
    ///
    /// The write is conditional on the status read, so a concurrent update
    /// is never overwritten; the notification is then treated as stale.
    #[instrument(skip(self, status), fields(account_name = %status.account.account_name))]
    pub async fn apply_lifecycle(
        &self,
        status: &ManagedAccountStatus,
    ) -> ReconcileResult<ReconcileOutcome> {
        let account_name = status.account.account_name.clone();
        let update = status.to_update();

        let Some(mut record) = self.store.get(&account_name).await? else {
            warn!(account_name = %account_name, "Lifecycle event for an account with no request record");
            return Ok(ReconcileOutcome::UnknownAccount { account_name });
        };

        let current = record.status.clone();
        if !current.can_advance_to(&update.status) {
            warn!(
                account_name = %account_name,
                current = %current,
                reported = %update.status,
                "Ignoring lifecycle event that would move the status backwards"
            );
            return Ok(ReconcileOutcome::Stale {
                account_name,
                current,
                reported: update.status,
            });
        }

        let reported = update.status.clone();
        let reported_id = update.account_id.clone();
        if !record.apply(update) {
            warn!(
                account_name = %account_name,
                stored = %record.account_id,
                reported = ?reported_id,
                "Keeping previously recorded account id"
            );
        }

        if !self.store.put_if_status(&record, &current).await? {
            warn!(account_name = %account_name, "Record changed concurrently, lifecycle event not applied");
            let current = self
                .store
                .get(&account_name)
                .await?
                .map_or(current, |r| r.status);
            return Ok(ReconcileOutcome::Stale {
                account_name,
                current,
                reported,
            });
        }

        info!(
            account_name = %account_name,
            status = %record.status,
            account_id = %record.account_id,
            "Recorded lifecycle status"
        );
        Ok(ReconcileOutcome::Updated { record })
    }

    /// Check a just-dispatched workflow for an early failure.
    ///
    /// Up to the configured number of checks, one interval apart. A
    /// workflow that leaves `UNDER_CHANGE` for anything but `AVAILABLE`
    /// marks the record NOT_PROVISIONED, provided it is still IN_PROGRESS
    /// (or DISPATCHING, when the submission was never recorded).
    #[instrument(skip(self))]
    pub async fn poll_after_dispatch(
        &self,
        account_name: &str,
        workflow_id: &str,
    ) -> ReconcileResult<PollOutcome> {
        for attempt in 1..=self.poll.attempts {
            let status = self.catalog.workflow_status(workflow_id).await?;

            if status.is_under_change() {
                debug!(attempt, workflow_id = %workflow_id, "Workflow still under change");
                if attempt < self.poll.attempts {
                    tokio::time::sleep(self.poll.interval).await;
                }
                continue;
            }

            if status.status == WORKFLOW_AVAILABLE {
                info!(workflow_id = %workflow_id, "Workflow already available");
                return Ok(PollOutcome::Completed);
            }

            let message = status.message.clone().unwrap_or_else(|| {
                format!("Provisioning workflow {workflow_id} ended with status {}", status.status)
            });
            warn!(
                account_name = %account_name,
                workflow_status = %status.status,
                message = %message,
                "Provisioning workflow failed early"
            );
            let mut recorded = false;
            for expected in [RequestStatus::InProgress, RequestStatus::Dispatching] {
                recorded = self
                    .store
                    .transition(
                        account_name,
                        &expected,
                        StatusUpdate::not_provisioned(message.clone()),
                    )
                    .await?;
                if recorded {
                    break;
                }
            }
            return Ok(PollOutcome::EarlyFailure {
                status: status.status,
                message,
                recorded,
            });
        }

        info!(
            account_name = %account_name,
            checks = self.poll.attempts,
            "Workflow still running, waiting for lifecycle event"
        );
        Ok(PollOutcome::StillRunning {
            checks: self.poll.attempts,
        })
    }
}
